//! JWT access and refresh tokens (HS256)

use super::AuthError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use studyhub_core::UserId;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: UserId,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Sign a fresh token. Returns the encoded token with its claims.
    pub fn issue(
        &self,
        user_id: UserId,
        token_type: TokenType,
    ) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(self.ttl(token_type))
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let claims = Claims {
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
            user_id,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok((token, claims))
    }

    /// Refresh + access pair. The refresh claims are returned so the caller
    /// can record them as outstanding.
    pub fn issue_pair(&self, user_id: UserId) -> Result<(TokenPair, Claims), AuthError> {
        let (refresh, refresh_claims) = self.issue(user_id, TokenType::Refresh)?;
        let (access, _) = self.issue(user_id, TokenType::Access)?;
        Ok((TokenPair { refresh, access }, refresh_claims))
    }

    /// Verify signature, expiry and token type.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        if data.claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(
            "test-secret",
            Duration::from_secs(300),
            Duration::from_secs(86400),
        )
    }

    #[test]
    fn test_issue_and_decode() {
        let keys = keys();
        let (token, claims) = keys.issue(42, TokenType::Access).unwrap();
        let decoded = keys.decode(&token, TokenType::Access).unwrap();
        assert_eq!(decoded.user_id, 42);
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.exp - decoded.iat, 300);
    }

    #[test]
    fn test_token_type_enforced() {
        let keys = keys();
        let (pair, refresh) = keys.issue_pair(7).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(matches!(
            keys.decode(&pair.refresh, TokenType::Access),
            Err(AuthError::WrongTokenType)
        ));
        assert!(keys.decode(&pair.access, TokenType::Access).is_ok());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = JwtKeys::new("other", Duration::from_secs(60), Duration::from_secs(60));
        let (token, _) = other.issue(1, TokenType::Access).unwrap();
        assert!(matches!(
            keys().decode(&token, TokenType::Access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::new("s", Duration::from_secs(0), Duration::from_secs(0));
        let (token, _) = keys.issue(1, TokenType::Access).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert!(keys.decode(&token, TokenType::Access).is_err());
    }
}
