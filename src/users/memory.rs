use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};

/// In-process store for tests. The write lock makes the email check and the
/// insert one step, mirroring the unique index of the PostgreSQL store.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        // newest insert first on equal timestamps
        let mut out: Vec<User> = users.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let created = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.password_hash = password_hash.to_owned();
            u.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "A".into(),
            last_name: "B".into(),
            email: email.into(),
            password_hash: "$argon2id$placeholder".into(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = InMemoryUserStore::default();
        store.insert(new_user("a@x.com")).await.unwrap();
        let err = store.insert(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn concurrent_registrations_yield_one_record() {
        let store = std::sync::Arc::new(InMemoryUserStore::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(new_user("race@x.com")).await })
            })
            .collect();
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = InMemoryUserStore::default();
        let first = store.insert(new_user("1@x.com")).await.unwrap();
        let second = store.insert(new_user("2@x.com")).await.unwrap();
        let ids: Vec<Uuid> = store.list().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_ids() {
        let store = InMemoryUserStore::default();
        assert!(store
            .update_password(Uuid::new_v4(), "h")
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete(Uuid::new_v4()).await.unwrap());
    }
}

/// Store whose every call fails as if the database stopped answering.
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn insert(&self, _user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn update_password(
        &self,
        _id: Uuid,
        _password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn close(&self) {}
}
