pub mod jwt_token_issuer;
