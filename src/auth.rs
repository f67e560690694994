//! Account signup, login and bearer-token resolution
//!
//! Passwords are stored as bcrypt hashes. Sessions are opaque random
//! tokens; the data file only keeps their SHA-256 digest, an expiry, and at
//! most [`MAX_SESSIONS_PER_USER`] live sessions per account.

use crate::demo::demo_drafts;
use crate::error::CashflowError;
use crate::models::{PublicUser, Session, User};
use crate::store::JsonStore;
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// bcrypt work factor used by the original service
pub const DEFAULT_HASH_COST: u32 = 10;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
pub const MAX_SESSIONS_PER_USER: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

pub struct AuthService {
    store: Arc<JsonStore>,
    seed_demo_data: bool,
    hash_cost: u32,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<JsonStore>) -> Self {
        Self {
            store,
            seed_demo_data: false,
            hash_cost: DEFAULT_HASH_COST,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    /// Give every new account the sample book
    pub fn with_demo_data(mut self, enabled: bool) -> Self {
        self.seed_demo_data = enabled;
        self
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<AuthResponse> {
        let (email, password) = required_credentials(req.email, req.password)?;

        let user = User {
            id: Uuid::new_v4(),
            email,
            name: req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            password_hash: hash_password(password, self.hash_cost).await?,
            created_at: Utc::now(),
        };

        let user = self.store.insert_user(user).await?;
        info!(user_id = %user.id, "Account created");

        if self.seed_demo_data {
            let now = Utc::now();
            if let Err(e) = self
                .store
                .add_many(user.id, demo_drafts(now.date_naive()), now)
                .await
            {
                warn!(user_id = %user.id, "Failed to seed demo data: {}", e);
            }
        }

        self.issue_session(&user).await
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let (email, password) = required_credentials(req.email, req.password)?;
        let invalid = || CashflowError::InvalidInput("Invalid credentials".to_string());

        let user = self.store.find_user_by_email(&email).await.ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash).await {
            warn!(user_id = %user.id, "Login rejected");
            return Err(invalid());
        }

        self.issue_session(&user).await
    }

    /// Resolve a bearer token to its user
    pub async fn authenticate(&self, token: &str) -> Result<PublicUser> {
        self.authenticate_at(token, Utc::now()).await
    }

    pub async fn authenticate_at(&self, token: &str, now: DateTime<Utc>) -> Result<PublicUser> {
        let unauthorized = || CashflowError::Unauthorized("Invalid or expired token".to_string());

        let user_id = self
            .store
            .session_user(&token_digest(token), now)
            .await
            .ok_or_else(unauthorized)?;
        let user = self.store.find_user(user_id).await.ok_or_else(unauthorized)?;

        Ok(PublicUser::from(&user))
    }

    async fn issue_session(&self, user: &User) -> Result<AuthResponse> {
        let token = new_token();
        let now = Utc::now();

        self.store
            .insert_session(
                Session {
                    token_digest: token_digest(&token),
                    user_id: user.id,
                    created_at: now,
                    expires_at: now + self.session_ttl,
                },
                MAX_SESSIONS_PER_USER,
            )
            .await?;

        Ok(AuthResponse {
            token,
            user: PublicUser::from(user),
        })
    }
}

fn required_credentials(email: Option<String>, password: Option<String>) -> Result<(String, String)> {
    let email = email.map(|e| e.trim().to_string()).unwrap_or_default();
    let password = password.unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(CashflowError::InvalidInput(
            "Email and password required".to_string(),
        ));
    }

    Ok((email, password))
}

/// bcrypt is CPU-bound, so it runs on the blocking pool
async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| CashflowError::PasswordHashError(e.to_string()))?
        .map_err(|e| CashflowError::PasswordHashError(e.to_string()))
}

/// False for a wrong password and for hashes bcrypt cannot read
async fn verify_password(password: String, hash: &str) -> bool {
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(valid)) => valid,
        Ok(Err(e)) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
        Err(e) => {
            warn!("Password check aborted: {}", e);
            false
        }
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;

    const TEST_HASH_COST: u32 = 4;

    fn service(store: Arc<JsonStore>) -> AuthService {
        AuthService::new(store).with_hash_cost(TEST_HASH_COST)
    }

    fn signup_req(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            name: Some("Dana".to_string()),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let auth = service(Arc::new(JsonStore::in_memory()));

        let created = auth.signup(signup_req("dana@shop.test", "s3cret")).await.unwrap();
        assert_eq!(created.user.email, "dana@shop.test");
        assert_eq!(created.user.name.as_deref(), Some("Dana"));

        let login = auth.login(login_req("dana@shop.test", "s3cret")).await.unwrap();
        assert_eq!(login.user.id, created.user.id);
        assert_ne!(login.token, created.token);

        let resolved = auth.authenticate(&login.token).await.unwrap();
        assert_eq!(resolved, created.user);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let auth = service(Arc::new(JsonStore::in_memory()));
        auth.signup(signup_req("dana@shop.test", "s3cret")).await.unwrap();

        for (email, password) in [("dana@shop.test", "wrong"), ("nobody@shop.test", "s3cret")] {
            let err = auth.login(login_req(email, password)).await.unwrap_err();
            assert!(matches!(err, CashflowError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let auth = service(Arc::new(JsonStore::in_memory()));

        let err = auth.signup(signup_req("", "pw")).await.unwrap_err();
        assert!(matches!(err, CashflowError::InvalidInput(_)));

        let err = auth
            .signup(SignupRequest {
                email: Some("a@b.test".to_string()),
                ..SignupRequest::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CashflowError::InvalidInput(_)));

        auth.signup(signup_req("a@b.test", "pw")).await.unwrap();
        let err = auth.signup(signup_req("a@b.test", "pw2")).await.unwrap_err();
        assert!(matches!(err, CashflowError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let auth = service(Arc::new(JsonStore::in_memory()));
        let err = auth.authenticate("deadbeef").await.unwrap_err();
        assert!(matches!(err, CashflowError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let auth = service(Arc::new(JsonStore::in_memory())).with_session_ttl(Duration::hours(1));
        let created = auth.signup(signup_req("dana@shop.test", "pw")).await.unwrap();

        let soon = Utc::now() + Duration::minutes(30);
        assert!(auth.authenticate_at(&created.token, soon).await.is_ok());

        let later = Utc::now() + Duration::hours(2);
        let err = auth.authenticate_at(&created.token, later).await.unwrap_err();
        assert!(matches!(err, CashflowError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_repeated_logins_keep_sessions_bounded() {
        let store = Arc::new(JsonStore::in_memory());
        let auth = service(Arc::clone(&store));
        let first = auth.signup(signup_req("dana@shop.test", "pw")).await.unwrap();

        let mut last = None;
        for _ in 0..50 {
            last = Some(auth.login(login_req("dana@shop.test", "pw")).await.unwrap());
        }

        let stored = store.read(|db| db.sessions.len()).await;
        assert!(stored <= MAX_SESSIONS_PER_USER, "{} sessions stored", stored);

        let last = last.unwrap();
        assert!(auth.authenticate(&last.token).await.is_ok());
        assert!(auth.authenticate(&first.token).await.is_err());
    }

    #[tokio::test]
    async fn test_tokens_are_not_stored_in_clear() {
        let store = Arc::new(JsonStore::in_memory());
        let auth = service(Arc::clone(&store));
        let created = auth.signup(signup_req("dana@shop.test", "pw")).await.unwrap();

        let stored = store
            .read(|db| db.sessions.iter().map(|s| s.token_digest.clone()).collect::<Vec<_>>())
            .await;
        assert_eq!(stored, vec![token_digest(&created.token)]);
        assert_ne!(stored[0], created.token);
    }

    #[tokio::test]
    async fn test_demo_data_seeding() {
        let store = Arc::new(JsonStore::in_memory());
        let auth = service(Arc::clone(&store)).with_demo_data(true);

        let created = auth.signup(signup_req("demo@shop.test", "pw")).await.unwrap();
        assert_eq!(store.list(created.user.id).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_password_hashing() {
        let a = hash_password("pw".to_string(), TEST_HASH_COST).await.unwrap();
        let b = hash_password("pw".to_string(), TEST_HASH_COST).await.unwrap();

        assert!(a.starts_with("$2"));
        assert_ne!(a, b, "each hash carries its own salt");
        assert!(verify_password("pw".to_string(), &a).await);
        assert!(!verify_password("wrong".to_string(), &a).await);
        assert!(!verify_password("pw".to_string(), "not-a-bcrypt-hash").await);
    }

    #[tokio::test]
    async fn test_invalid_cost_is_an_error() {
        let err = hash_password("pw".to_string(), 2).await.unwrap_err();
        assert!(matches!(err, CashflowError::PasswordHashError(_)));
    }
}
