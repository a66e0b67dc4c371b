pub mod auth;
pub mod config;
pub mod http;
pub mod persistence;
pub mod providers;

// Re-export commonly used types for convenience
pub use auth::jwt_token_issuer::JwtTokenIssuer;
pub use config::settings::Settings;
pub use persistence::{
    memory_unit_of_work::MemoryStore, postgres_unit_of_work::PostgresUnitOfWorkStarter,
};
pub use providers::{
    sha512_hasher::Sha512Hasher, static_salter::StaticSalter, system_clock::SystemClock,
    uuid_provider::UuidIdProvider,
};
