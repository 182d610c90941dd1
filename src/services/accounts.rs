//! Accounts: registration, login and bearer tokens.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::aggregates::User;
use crate::domain::value_objects::UserId;
use crate::store::Store;
use crate::{CatalogError, Result};

pub const BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
}

/// bcrypt off the async runtime.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| CatalogError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| CatalogError::Internal(format!("password hashing failed: {e}")))
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    iat: i64,
    exp: i64,
}

/// HS256 token issuer and verifier.
#[derive(Clone)]
pub struct Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Tokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self { encoding: EncodingKey::from_secret(secret), decoding: DecodingKey::from_secret(secret), ttl }
    }

    pub fn issue(&self, user_id: UserId) -> Result<String> {
        let now = Utc::now();
        let claims = Claims { sub: user_id, iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CatalogError::Internal(format!("token encoding failed: {e}")))
    }

    /// Signature and expiry check. Any failure is `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<UserId> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(|_| CatalogError::Unauthorized)
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    tokens: Tokens,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, tokens: Tokens) -> Self {
        Self { store, tokens }
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: Registration) -> Result<User> {
        input.validate()?;
        let hash = hash_password(input.password).await?;

        let user = User::register(input.username.trim(), input.email.trim().to_lowercase(), hash, input.first_name, input.last_name);
        self.store.insert_user(&user).await?;
        info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        let user = self.store.user_by_email(&email).await?.ok_or(CatalogError::InvalidCredentials)?;

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| CatalogError::Internal(format!("verification task failed: {e}")))?;
        match verified {
            Ok(true) => {}
            Ok(false) => return Err(CatalogError::InvalidCredentials),
            Err(e) => {
                warn!(user = %user.id, error = %e, "stored password hash is unreadable");
                return Err(CatalogError::InvalidCredentials);
            }
        }

        info!(user = %user.id, "login");
        self.tokens.issue(user.id)
    }

    pub fn verify(&self, token: &str) -> Result<UserId> {
        self.tokens.verify(token)
    }

    pub async fn user(&self, id: UserId) -> Result<User> {
        self.store.user(id).await?.ok_or_else(|| CatalogError::not_found("user", id))
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        Ok(self.store.users().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> AccountService {
        AccountService::new(Arc::new(InMemoryStore::new()), Tokens::new(b"test-secret", Duration::days(7)))
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.into(),
            email: email.into(),
            password: "hunter22".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let accounts = service();
        let user = accounts.register(registration("ada", "Ada@Example.com")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "hunter22");

        let token = accounts.login("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(accounts.verify(&token).unwrap(), user.id);
        assert_eq!(accounts.user(user.id).await.unwrap().username, "ada");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let accounts = service();
        accounts.register(registration("ada", "ada@example.com")).await.unwrap();
        assert!(matches!(accounts.login("ada@example.com", "wrong-pass").await, Err(CatalogError::InvalidCredentials)));
        assert!(matches!(accounts.login("bob@example.com", "hunter22").await, Err(CatalogError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicates_and_invalid_input() {
        let accounts = service();
        accounts.register(registration("ada", "ada@example.com")).await.unwrap();
        assert!(matches!(accounts.register(registration("ada", "other@example.com")).await, Err(CatalogError::Validation(_))));
        assert!(matches!(accounts.register(registration("ada2", "ada@example.com")).await, Err(CatalogError::Validation(_))));
        assert!(matches!(accounts.register(registration("bob", "not-an-email")).await, Err(CatalogError::Validation(_))));

        let mut short = registration("carol", "carol@example.com");
        short.password = "123".into();
        assert!(matches!(accounts.register(short).await, Err(CatalogError::Validation(_))));
    }

    #[test]
    fn test_token_rejections() {
        let tokens = Tokens::new(b"test-secret", Duration::days(7));
        let user = UserId::new();
        let token = tokens.issue(user).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), user);

        let other = Tokens::new(b"other-secret", Duration::days(7));
        assert!(matches!(other.verify(&token), Err(CatalogError::Unauthorized)));

        let expired = Tokens::new(b"test-secret", Duration::hours(-2)).issue(user).unwrap();
        assert!(matches!(tokens.verify(&expired), Err(CatalogError::Unauthorized)));
        assert!(matches!(tokens.verify("garbage"), Err(CatalogError::Unauthorized)));
    }
}
