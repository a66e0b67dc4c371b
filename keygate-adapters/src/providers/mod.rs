pub mod sha512_hasher;
pub mod static_salter;
pub mod system_clock;
pub mod uuid_provider;
