use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::RegisterRequest,
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::{
    auth::{Hasher, HashingError, JwtKeys, TokenClaims, UserClaims},
    error::{AppError, AppResult},
};

/// Register, login, verify and the plain CRUD operations over an injected store.
pub struct AccountService {
    store: Arc<dyn UserStore>,
    hasher: Hasher,
    keys: JwtKeys,
    // Verified against on unknown emails so both login failures cost the same.
    dummy_hash: String,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Hasher, keys: JwtKeys) -> Result<Self, HashingError> {
        let dummy_hash = hasher.hash("dummy-password-for-timing")?;
        Ok(Self {
            store,
            hasher,
            keys,
            dummy_hash,
        })
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: &str) -> AppResult<User> {
        let id = parse_id(id)?;
        self.store.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Hashes `password` before it replaces the stored hash.
    pub async fn update_password(&self, id: &str, password: &str) -> AppResult<User> {
        let id = parse_id(id)?;
        if password.is_empty() {
            return Err(AppError::required("password"));
        }
        let hash = self.hash_password(password.to_owned()).await?;
        let user = self
            .store
            .update_password(id, &hash)
            .await?
            .ok_or(AppError::NotFound)?;
        info!(user_id = %user.id, "password updated");
        Ok(user)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let id = parse_id(id)?;
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound);
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// The store's unique constraint, not a prior lookup, decides `Conflict`.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        let first_name = required("first_name", req.first_name.trim())?;
        let last_name = required("last_name", req.last_name.trim())?;
        let email = required("email", &normalize_email(&req.email))?;
        let password = required("password", &req.password)?;

        let password_hash = self.hash_password(password).await?;
        let user = self
            .store
            .insert(NewUser {
                first_name,
                last_name,
                email,
                password_hash,
            })
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                if matches!(err, AppError::Conflict) {
                    warn!("email already registered");
                }
                err
            })?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let Some(user) = self.store.find_by_email(&email).await? else {
            self.verify_password(password, self.dummy_hash.clone()).await?;
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !self
            .verify_password(password, user.password_hash.clone())
            .await?
        {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.keys.issue(&UserClaims::from(&user))?;
        info!(user_id = %user.id, "user logged in");
        Ok((token, user))
    }

    pub fn verify(&self, token: Option<&str>) -> AppResult<TokenClaims> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MissingToken)?;
        self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AppError::from(e)
        })
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
    }

    // Argon2 is CPU-bound; keep it off the async workers.
    async fn hash_password(&self, plain: String) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AppError::Internal(format!("hash task failed: {e}")))??;
        Ok(hash)
    }

    async fn verify_password(&self, plain: &str, hash: String) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))
    }
}

fn parse_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| AppError::NotFound)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(field: &str, value: &str) -> AppResult<String> {
    if value.is_empty() {
        return Err(AppError::required(field));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::TokenError,
        config::{JwtConfig, PasswordConfig},
        users::memory::InMemoryUserStore,
    };

    fn test_service() -> AccountService {
        let hasher = Hasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .expect("valid params");
        let keys = JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_seconds: 3600,
        });
        AccountService::new(Arc::new(InMemoryUserStore::default()), hasher, keys)
            .expect("service")
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@x.com".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn register_hashes_password() {
        let svc = test_service();
        let user = svc.register(alice()).await.expect("register");
        assert_ne!(user.password_hash, "secret1");
        assert!(svc.hasher.verify("secret1", &user.password_hash));
    }

    #[tokio::test]
    async fn register_twice_is_conflict() {
        let svc = test_service();
        svc.register(alice()).await.expect("register");
        let err = svc.register(alice()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict));
    }

    #[tokio::test]
    async fn register_conflict_ignores_email_case() {
        let svc = test_service();
        svc.register(alice()).await.unwrap();
        let mut shouty = alice();
        shouty.email = "  A@X.COM ".into();
        assert!(matches!(
            svc.register(shouty).await.unwrap_err(),
            AppError::Conflict
        ));
    }

    #[tokio::test]
    async fn register_requires_every_field() {
        let svc = test_service();
        let mut req = alice();
        req.last_name = "   ".into();
        match svc.register(req).await.unwrap_err() {
            AppError::Validation(msg) => assert_eq!(msg, "last_name is required"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = test_service();
        svc.register(alice()).await.unwrap();
        let wrong_pw = svc.login("a@x.com", "wrong").await.unwrap_err();
        let unknown = svc.login("nobody@x.com", "secret1").await.unwrap_err();
        assert!(matches!(wrong_pw, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong_pw.message(), unknown.message());
    }

    #[tokio::test]
    async fn login_then_verify_roundtrip() {
        let svc = test_service();
        let user = svc.register(alice()).await.unwrap();
        let (token, _) = svc.login("a@x.com", "secret1").await.expect("login");
        assert!(!token.is_empty());

        let claims = svc.verify(Some(&token)).expect("verify");
        assert_eq!(claims.user.email, "a@x.com");
        assert_eq!(claims.user.id, user.id);
        assert_eq!(claims.user.first_name, "A");
    }

    #[tokio::test]
    async fn verify_rejects_missing_and_garbage() {
        let svc = test_service();
        assert!(matches!(svc.verify(None), Err(AppError::MissingToken)));
        assert!(matches!(svc.verify(Some("")), Err(AppError::MissingToken)));
        assert!(matches!(
            svc.verify(Some("garbage-token")),
            Err(AppError::InvalidToken(TokenError::Malformed))
        ));
    }

    #[tokio::test]
    async fn get_and_delete_unknown_ids() {
        let svc = test_service();
        let missing = Uuid::new_v4().to_string();
        assert!(matches!(svc.get(&missing).await, Err(AppError::NotFound)));
        assert!(matches!(svc.delete(&missing).await, Err(AppError::NotFound)));
        assert!(matches!(svc.get("not-a-uuid").await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn update_stores_a_hash_and_new_password_logs_in() {
        let svc = test_service();
        let user = svc.register(alice()).await.unwrap();
        let updated = svc
            .update_password(&user.id.to_string(), "secret2")
            .await
            .expect("update");
        assert_ne!(updated.password_hash, "secret2");
        assert!(updated.password_hash.starts_with("$argon2id$"));

        assert!(svc.login("a@x.com", "secret1").await.is_err());
        assert!(svc.login("a@x.com", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn update_unknown_id_and_empty_password() {
        let svc = test_service();
        let err = svc
            .update_password(&Uuid::new_v4().to_string(), "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let user = svc.register(alice()).await.unwrap();
        let err = svc
            .update_password(&user.id.to_string(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let svc = test_service();
        let user = svc.register(alice()).await.unwrap();
        svc.delete(&user.id.to_string()).await.expect("delete");
        assert!(matches!(
            svc.get(&user.id.to_string()).await,
            Err(AppError::NotFound)
        ));
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_logins_share_the_runtime() {
        let svc = Arc::new(test_service());
        svc.register(alice()).await.unwrap();

        let logins: Vec<_> = (0..8)
            .map(|i| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move {
                    let password = if i % 2 == 0 { "secret1" } else { "wrong" };
                    svc.login("a@x.com", password).await.is_ok()
                })
            })
            .collect();

        let mut ok = 0;
        for login in logins {
            if login.await.expect("login task") {
                ok += 1;
            }
        }
        assert_eq!(ok, 4);
    }
}
