//! HS256 JWT issuing and verification

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, TokenVerifier, UserId};
use crate::config::AuthConfig;
use crate::store::User;

/// Claims carried by every issued token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies tokens with a shared secret
pub struct JwtTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl JwtTokens {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    /// Issue a token for a user, valid for the configured TTL
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        self.sign(&claims)
    }

    /// Sign arbitrary claims
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Decode and validate a token, returning its claims
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

#[async_trait]
impl TokenVerifier for JwtTokens {
    async fn verify(&self, credential: &str) -> Result<UserId, AuthError> {
        self.decode(credential).map(|claims| claims.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn user() -> User {
        User {
            id: UserId::new("1"),
            email: "user@example.com".to_string(),
            name: Some("Test User".to_string()),
        }
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let tokens = JwtTokens::new(SECRET, 3600);
        let token = tokens.issue(&user()).unwrap();

        let user_id = tokens.verify(&token).await.unwrap();
        assert_eq!(user_id, UserId::new("1"));

        let claims = tokens.decode(&token).unwrap();
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.name.as_deref(), Some("Test User"));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let issuer = JwtTokens::new(SECRET, 3600);
        let verifier = JwtTokens::new("a-completely-different-secret-value", 3600);
        let token = issuer.issue(&user()).unwrap();

        let result = verifier.verify(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let tokens = JwtTokens::new(SECRET, 3600);
        let now = Utc::now().timestamp();
        let token = tokens
            .sign(&Claims {
                user_id: UserId::new("1"),
                email: "user@example.com".to_string(),
                name: None,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        let result = tokens.verify(&token).await;
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn test_garbage_rejected() {
        let tokens = JwtTokens::new(SECRET, 3600);
        assert!(matches!(
            tokens.verify("not-a-jwt").await,
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            tokens.verify("").await,
            Err(AuthError::InvalidToken(_))
        ));
    }
}
