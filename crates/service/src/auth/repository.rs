use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, username: &str, is_superuser: bool) -> Result<AuthUser, AuthError>;
    async fn grant_permission(&self, user_id: Uuid, codename: &str) -> Result<(), AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>,   // key: username
        creds: Mutex<HashMap<Uuid, Credentials>>,  // key: user_id
        perms: Mutex<HashSet<(Uuid, String)>>,
    }

    impl MockAuthRepository {
        pub fn permissions_of(&self, user_id: Uuid) -> Vec<String> {
            let perms = self.perms.lock().unwrap();
            let mut out: Vec<String> = perms.iter().filter(|(u, _)| *u == user_id).map(|(_, c)| c.clone()).collect();
            out.sort();
            out
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_username(&self, username: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(username).cloned())
        }

        async fn create_user(&self, username: &str, is_superuser: bool) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(username) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser { id: Uuid::new_v4(), username: username.to_string(), is_superuser, is_active: true };
            users.insert(username.to_string(), user.clone());
            Ok(user)
        }

        async fn grant_permission(&self, user_id: Uuid, codename: &str) -> Result<(), AuthError> {
            self.perms.lock().unwrap().insert((user_id, codename.to_string()));
            Ok(())
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let mut creds = self.creds.lock().unwrap();
            let c = Credentials { user_id, password_hash, password_algorithm };
            creds.insert(user_id, c.clone());
            Ok(c)
        }
    }
}
