//! JWT service for token generation and validation
//!
//! Tokens are HS256-signed with a shared secret so that the auth service
//! (which issues them) and the api service (which only checks them) can run
//! as separate processes with the same configuration.

use anyhow::Result;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthFailure;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared signing secret
    pub secret: String,
    /// Token lifetime in seconds (default: 7 days)
    pub expires_in: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Signing secret (required)
    /// - `JWT_EXPIRES_IN`: Token lifetime in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let expires_in = std::env::var("JWT_EXPIRES_IN")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        Ok(JwtConfig { secret, expires_in })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate a token for a user
    pub fn generate_token(&self, user_id: Uuid) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.config.expires_in,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthFailure> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected token: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthFailure::ExpiredToken,
                    _ => AuthFailure::InvalidToken,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn service(secret: &str) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            expires_in: 3600,
        })
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_SECRET", "s3cret");
            std::env::remove_var("JWT_EXPIRES_IN");
        }
        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.expires_in, 604800);

        unsafe {
            std::env::set_var("JWT_EXPIRES_IN", "60");
        }
        assert_eq!(JwtConfig::from_env().unwrap().expires_in, 60);

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_EXPIRES_IN");
        }
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = service("secret");
        let user_id = Uuid::new_v4();
        let token = jwt.generate_token(user_id).unwrap();
        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = service("one").generate_token(Uuid::new_v4()).unwrap();
        assert_eq!(
            service("two").validate_token(&token).unwrap_err(),
            AuthFailure::InvalidToken
        );
        assert_eq!(
            service("one").validate_token("garbage").unwrap_err(),
            AuthFailure::InvalidToken
        );
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let jwt = service("secret");
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &jwt.encoding_key).unwrap();
        assert_eq!(
            jwt.validate_token(&token).unwrap_err(),
            AuthFailure::ExpiredToken
        );
    }
}
