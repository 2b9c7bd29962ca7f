use sea_orm::DatabaseConnection;
use uuid::Uuid;

use models::errors::ModelError;
use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn repo_err(e: ModelError) -> AuthError {
    match e {
        ModelError::Validation(msg) => AuthError::Validation(msg),
        other => AuthError::Repository(other.to_string()),
    }
}

fn to_auth_user(u: models::user::Model) -> AuthUser {
    AuthUser { id: u.id, username: u.username, is_superuser: u.is_superuser, is_active: u.is_active }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_username(&self.db, username).await.map_err(repo_err)?;
        Ok(res.map(to_auth_user))
    }

    async fn create_user(&self, username: &str, is_superuser: bool) -> Result<AuthUser, AuthError> {
        let created = models::user::create(&self.db, username, is_superuser).await.map_err(repo_err)?;
        Ok(to_auth_user(created))
    }

    async fn grant_permission(&self, user_id: Uuid, codename: &str) -> Result<(), AuthError> {
        models::user_permission::grant(&self.db, user_id, codename).await.map_err(repo_err)
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::find_by_user(&self.db, user_id).await.map_err(repo_err)?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = models::user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm)
            .await
            .map_err(repo_err)?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::{AuthConfig, AuthService};
    use crate::auth::domain::{LoginInput, NewUserInput};
    use crate::permissions::load_principal;
    use crate::test_support::get_db;
    use std::sync::Arc;

    #[tokio::test]
    async fn login_against_database() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let svc = AuthService::new(Arc::new(SeaOrmAuthRepository::new(db.clone())), AuthConfig::new("secret", 1));
        let user = svc
            .create_user(NewUserInput {
                username: "editor".into(),
                password: "Passw0rd!".into(),
                is_superuser: false,
                permissions: vec!["tenancy.change_tenant".into()],
            })
            .await?;

        let session = svc.login(LoginInput { username: "editor".into(), password: "Passw0rd!".into() }).await?;
        assert_eq!(svc.verify_token(&session.token)?, user.id);

        let principal = load_principal(&db, user.id).await?.expect("active user");
        assert!(principal.permissions.contains("tenancy.change_tenant"));
        Ok(())
    }
}
