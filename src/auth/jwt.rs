//! JWT token management
//!
//! Issues and validates HS256 access tokens

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
    errors::ErrorKind,
};
use std::sync::Arc;

use crate::auth::permissions::UserRole;
use crate::auth::types::{JwtClaims, TOKEN_AUDIENCE, TOKEN_ISSUER};
use crate::config::AuthConfig;
use crate::error::Result;

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: Arc<AuthConfig>,
}

impl JwtManager {
    /// Create new JWT manager
    #[must_use]
    pub fn new(config: Arc<AuthConfig>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 30; // 30 seconds tolerance

        Self {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate access token
    pub fn generate_token(&self, user_id: i32, email: &str, role: UserRole) -> Result<String> {
        let claims = JwtClaims::new(user_id, email.to_string(), role, self.config.jwt_expires_in);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| crate::dashboard_err!(internal, "Failed to generate authentication token: {}", e))
    }

    /// Validate and parse token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        let token_data: TokenData<JwtClaims> = decode(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => crate::dashboard_err!(auth, "Token expired"),
                _ => crate::dashboard_err!(auth, "Invalid token"),
            })?;

        let claims = token_data.claims;
        if claims.is_expired() {
            return Err(crate::dashboard_err!(auth, "Token expired"));
        }

        Ok(claims)
    }

    /// Token lifetime in seconds
    #[must_use]
    pub fn expires_in(&self) -> i64 {
        self.config.jwt_expires_in
    }
}
