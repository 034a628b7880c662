use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::User;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            // Saturates; the expiry check in `issue_at` rejects what does not fit
            ttl: i64::try_from(ttl_hours)
                .ok()
                .and_then(Duration::try_hours)
                .unwrap_or(Duration::MAX),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;

        let claims = Claims {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "user-1".into(),
            username: "JSmith".into(),
            email: "johnsmith123@gmail.com".into(),
            password_hash: "hash".into(),
            first_name: "John".into(),
            last_name: "Smith".into(),
            image: None,
            active: true,
            pin_hash: None,
        }
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let issuer = TokenIssuer::new("secret", 24);
        let token = issuer.issue(&user()).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.username, "JSmith");
        assert_eq!(claims.email, "johnsmith123@gmail.com");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("secret", 24);
        let token = issuer
            .issue_at(&user(), Utc::now() - Duration::days(2))
            .unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenIssuer::new("one", 24).issue(&user()).unwrap();
        assert!(TokenIssuer::new("two", 24).verify(&token).is_err());
        assert!(TokenIssuer::new("one", 24).verify("not-a-jwt").is_err());
    }

    #[test]
    fn expiry_past_the_calendar_is_an_error_not_a_panic() {
        let issuer = TokenIssuer::new("secret", 10_000_000_000);
        assert!(matches!(
            issuer.issue(&user()),
            Err(TokenError::ExpiryOutOfRange)
        ));

        let issuer = TokenIssuer::new("secret", u64::MAX);
        assert!(matches!(
            issuer.issue(&user()),
            Err(TokenError::ExpiryOutOfRange)
        ));
    }
}
