//! User accounts

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::error::{StoreError, StoreResult};
use crate::auth::UserId;

/// Public view of a user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

struct Account {
    user: User,
    password: String,
}

/// In-memory user accounts
pub struct UserStore {
    accounts: RwLock<Vec<Account>>,
}

impl UserStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
        }
    }

    /// Create a store holding the development account
    /// `user@example.com` / `password123`
    pub fn seeded() -> Self {
        let account = Account {
            user: User {
                id: UserId::new("1"),
                email: "user@example.com".to_string(),
                name: Some("Test User".to_string()),
            },
            password: "password123".to_string(),
        };

        Self {
            accounts: RwLock::new(vec![account]),
        }
    }

    /// Check an email/password pair
    pub async fn authenticate(&self, email: &str, password: &str) -> StoreResult<User> {
        let accounts = self.accounts.read().await;
        accounts
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .map(|a| a.user.clone())
            .ok_or(StoreError::InvalidCredentials)
    }

    /// Create a new account
    pub async fn register(&self, email: &str, password: &str, name: &str) -> StoreResult<User> {
        let mut accounts = self.accounts.write().await;

        if accounts.iter().any(|a| a.user.email == email) {
            return Err(StoreError::EmailTaken(email.to_string()));
        }

        let user = User {
            id: UserId::new((accounts.len() + 1).to_string()),
            email: email.to_string(),
            name: Some(name.to_string()),
        };
        accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Look up a user by id
    pub async fn get(&self, id: &UserId) -> Option<User> {
        self.accounts
            .read()
            .await
            .iter()
            .find(|a| &a.user.id == id)
            .map(|a| a.user.clone())
    }

    pub async fn count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_login() {
        let store = UserStore::seeded();

        let user = store
            .authenticate("user@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new("1"));

        let result = store.authenticate("user@example.com", "wrong").await;
        assert!(matches!(result, Err(StoreError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_register_assigns_next_id() {
        let store = UserStore::seeded();

        let user = store
            .register("new@example.com", "secret", "New User")
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new("2"));
        assert_eq!(store.count().await, 2);
        assert_eq!(store.get(&user.id).await, Some(user));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = UserStore::seeded();

        let result = store
            .register("user@example.com", "another", "Someone")
            .await;
        assert!(matches!(result, Err(StoreError::EmailTaken(_))));
        assert_eq!(store.count().await, 1);
    }
}
