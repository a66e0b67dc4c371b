pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    auth_claims::AuthClaims,
    session::Session,
    user::User,
};

pub use error::AuthError;

pub use ports::{
    providers::{Clock, Hasher, IdProvider, Salter, TokenIssuer, TokenSignError},
    store::{
        CreateOutcome, SessionRepository, StoreError, UnitOfWork, UnitOfWorkStarter,
        UpdateOutcome, UserRepository,
    },
};
