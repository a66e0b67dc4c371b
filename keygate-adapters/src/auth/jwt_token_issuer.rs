use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keygate_core::{AuthClaims, TokenIssuer, TokenSignError};

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// HS512-signed access tokens carrying `{user_id, expires_at}`.
///
/// Verification accepts HS512 only; a token declaring any other algorithm
/// is invalid regardless of its signature. Expiry lives in the custom
/// claim and is the caller's check, so the registered `exp` handling is
/// disabled.
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenIssuer {
    pub fn new(signing_key: &Secret<String>) -> Self {
        let secret = signing_key.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, claims: &AuthClaims) -> Result<String, TokenSignError> {
        let claims = JwtClaims {
            user_id: claims.user_id,
            expires_at: claims.expires_at,
        };

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(TokenSignError::new)
    }

    fn try_parse(&self, token: &str) -> Option<AuthClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .ok()
            .map(|data| AuthClaims {
                user_id: data.claims.user_id,
                expires_at: data.claims.expires_at,
            })
    }
}
