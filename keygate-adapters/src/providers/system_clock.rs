use chrono::{DateTime, SubsecRound, Utc};
use keygate_core::Clock;

/// Wall clock rounded to whole seconds. `created_at` feeds the salt, so
/// the timestamp must survive a store round-trip bit-for-bit; sub-second
/// precision would be truncated by the column type and break hash
/// re-derivation.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().round_subsecs(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_has_no_subsecond_component() {
        use chrono::Timelike;

        assert_eq!(SystemClock.now().nanosecond(), 0);
    }
}
