/**
 * Session Tokens
 *
 * Sessions are owned by the external identity provider. The API only
 * verifies the bearer JWT it issued and maps it to a user row through the
 * token identifier `<issuer>|<subject>`.
 *
 * Two key types are supported:
 * - an RS256 public key (PEM), as published by hosted identity providers
 * - an HS256 shared secret, for local development and tests
 */

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::backend::error::BackendError;
use crate::shared::config::AuthConfig;

/// JWT claims we rely on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-provider user id
    pub sub: String,
    /// Issuer; part of the token identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

impl Claims {
    /// Stable key of the identity: `<issuer>|<subject>`
    pub fn token_identifier(&self) -> String {
        token_identifier(self.iss.as_deref().unwrap_or_default(), &self.sub)
    }
}

/// Build a token identifier from its parts
pub fn token_identifier(issuer: &str, subject: &str) -> String {
    format!("{}|{}", issuer, subject)
}

/// Verifies bearer tokens against the configured key
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier from the auth configuration
    ///
    /// The RSA public key wins when both keys are configured.
    pub fn from_config(config: &AuthConfig) -> Result<Self, BackendError> {
        let (key, algorithm) = match (&config.jwt_public_key_pem, &config.jwt_secret) {
            (Some(pem), _) => {
                let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| BackendError::internal(format!("invalid JWT public key: {}", e)))?;
                (key, Algorithm::RS256)
            }
            (None, Some(secret)) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            (None, None) => {
                return Err(BackendError::internal("no JWT verification key configured"));
            }
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }

        Ok(Self { key, validation })
    }

    /// Verify and decode a JWT token
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Mint an HS256 token
///
/// Used by tests and local tooling; production tokens come from the identity
/// provider.
pub fn create_token(
    secret: &str,
    issuer: Option<&str>,
    subject: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: subject.to_string(),
        iss: issuer.map(str::to_string),
        exp: now + ttl_secs,
        iat: Some(now),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(issuer: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: Some("test-secret".to_string()),
            jwt_public_key_pem: None,
            jwt_issuer: issuer.map(str::to_string),
            webhook_signing_secret: None,
        }
    }

    #[test]
    fn test_verify_token() {
        let verifier = TokenVerifier::from_config(&config(Some("https://id.example"))).unwrap();
        let token = create_token("test-secret", Some("https://id.example"), "user_1", 60).unwrap();

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "user_1");
        assert_eq!(claims.token_identifier(), "https://id.example|user_1");
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let verifier = TokenVerifier::from_config(&config(Some("https://id.example"))).unwrap();
        let token = create_token("test-secret", Some("https://evil.example"), "user_1", 60).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let verifier = TokenVerifier::from_config(&config(None)).unwrap();
        let token = create_token("other-secret", None, "user_1", 60).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_verify_invalid_token() {
        let verifier = TokenVerifier::from_config(&config(None)).unwrap();
        assert!(verifier.verify("invalid.token.here").is_err());
    }

    #[test]
    fn test_missing_key_is_a_config_error() {
        let result = TokenVerifier::from_config(&AuthConfig::default());
        assert!(result.is_err());
    }
}
