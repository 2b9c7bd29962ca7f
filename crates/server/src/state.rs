use std::sync::Arc;

use sea_orm::DatabaseConnection;

use configs::{AppConfig, PaginationConfig};
use service::auth::{repo::SeaOrmAuthRepository, service::{AuthConfig, AuthService}};

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: ServerAuthConfig,
    pub pagination: PaginationConfig,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, cfg: &AppConfig) -> Self {
        Self {
            db,
            auth: ServerAuthConfig { jwt_secret: cfg.auth.jwt_secret.clone(), token_ttl_hours: cfg.auth.token_ttl_hours },
            pagination: cfg.pagination.clone(),
        }
    }

    pub fn auth_service(&self) -> AuthService<SeaOrmAuthRepository> {
        let repo = Arc::new(SeaOrmAuthRepository::new(self.db.clone()));
        AuthService::new(repo, AuthConfig::new(&self.auth.jwt_secret, self.auth.token_ttl_hours))
    }
}
