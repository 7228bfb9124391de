//! JWT credential issuing and verification

use crate::config::JwtConfig;
use crate::domain::{Identity, Role};
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Role name ("user", "admin", ...)
    pub role: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// HMAC-signed token manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Only the HMAC family is accepted; tokens signed with anything else
    /// (RSA, EC, `none`) fail validation. Leeway is kept at 5 seconds.
    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        v.leeway = 5;
        v.validate_aud = false;
        v.set_issuer(&[&self.config.issuer]);
        v.set_required_spec_claims(&["exp", "iss", "sub"]);
        v
    }

    /// Create an access token for a subject and role
    pub fn create_token(&self, subject_id: &str, role: Role) -> Result<String> {
        self.create_token_with_ttl(subject_id, role, Duration::seconds(self.config.token_ttl_secs))
    }

    /// Create an access token with an explicit lifetime
    pub fn create_token_with_ttl(
        &self,
        subject_id: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: subject_id.to_string(),
            role: role.as_str().to_string(),
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key).map_err(|e| AppError::Internal(e.into()))
    }

    /// Verify and decode an access token
    pub fn verify_token(&self, token: &str) -> Result<AccessClaims> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation())?;
        Ok(token_data.claims)
    }

    /// Verify a token and resolve the caller identity.
    ///
    /// Fails with `Unauthenticated` for a bad signature, foreign algorithm,
    /// expiry, wrong issuer, empty subject or an unknown role.
    pub fn verify_identity(&self, token: &str) -> Result<Identity> {
        let claims = self.verify_token(token).map_err(|e| match e {
            AppError::Jwt(inner) => {
                tracing::debug!(error = %inner, "Token verification failed");
                AppError::Unauthenticated("invalid token".to_string())
            }
            other => other,
        })?;

        if claims.sub.is_empty() {
            return Err(AppError::Unauthenticated("invalid token".to_string()));
        }
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| AppError::Unauthenticated("invalid token".to_string()))?;

        Ok(Identity::new(claims.sub, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing-purposes-only".to_string(),
            issuer: "carstore".to_string(),
            token_ttl_secs: 3600,
        }
    }

    #[test]
    fn test_create_and_verify_token() {
        let manager = JwtManager::new(test_config());
        let token = manager.create_token("user-42", Role::User).unwrap();

        let identity = manager.verify_identity(&token).unwrap();
        assert_eq!(identity.subject_id(), "user-42");
        assert_eq!(identity.role(), Role::User);
    }

    #[test]
    fn test_claims_content() {
        let manager = JwtManager::new(test_config());
        let token = manager.create_token("admin-1", Role::Admin).unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.iss, "carstore");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new(test_config());
        let token = manager
            .create_token_with_ttl("user-42", Role::User, Duration::seconds(-60))
            .unwrap();

        let result = manager.verify_identity(&token);
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = JwtManager::new(test_config());
        let other = JwtManager::new(JwtConfig {
            secret: "a-completely-different-secret-value".to_string(),
            ..test_config()
        });
        let token = other.create_token("user-42", Role::Admin).unwrap();

        assert!(matches!(
            manager.verify_identity(&token),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let manager = JwtManager::new(test_config());
        let other = JwtManager::new(JwtConfig {
            issuer: "someone-else".to_string(),
            ..test_config()
        });
        let token = other.create_token("user-42", Role::User).unwrap();

        assert!(manager.verify_identity(&token).is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let manager = JwtManager::new(test_config());
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: "user-42".to_string(),
            role: "root".to_string(),
            iss: "carstore".to_string(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(test_config().secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            manager.verify_identity(&token),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let manager = JwtManager::new(test_config());
        // {"alg":"none","typ":"JWT"} . {"sub":"x","role":"admin","iss":"carstore","iat":0,"exp":9999999999} .
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJzdWIiOiJ4Iiwicm9sZSI6ImFkbWluIiwiaXNzIjoiY2Fyc3RvcmUiLCJpYXQiOjAsImV4cCI6OTk5OTk5OTk5OX0.";

        assert!(manager.verify_identity(token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let manager = JwtManager::new(test_config());
        assert!(manager.verify_identity("not-a-jwt").is_err());
    }
}
