use keygate_core::IdProvider;
use uuid::Uuid;

/// Random v4 identifiers for user ids and refresh tokens.
pub struct UuidIdProvider;

impl IdProvider for UuidIdProvider {
    fn random(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_ids_differ() {
        assert_ne!(UuidIdProvider.random(), UuidIdProvider.random());
    }
}
