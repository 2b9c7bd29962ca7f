use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::domain::{AuthSession, AuthUser, Claims, LoginInput, NewUserInput};
use super::errors::AuthError;
use super::repository::AuthRepository;
use crate::permissions::Permission;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: &str, token_ttl_hours: i64) -> Self {
        Self { jwt_secret: jwt_secret.to_string(), token_ttl_hours, password_algorithm: "argon2".into() }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Create an account with a hashed password and its permission codenames.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::NewUserInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig::new("secret", 12));
    /// let input = NewUserInput { username: "editor".into(), password: "Secret123".into(), is_superuser: false, permissions: vec!["tenancy.change_tenant".into()] };
    /// let user = tokio_test::block_on(svc.create_user(input)).unwrap();
    /// assert_eq!(repo.permissions_of(user.id), vec!["tenancy.change_tenant".to_string()]);
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: NewUserInput) -> Result<AuthUser, AuthError> {
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!("password too short (>={})", MIN_PASSWORD_LEN)));
        }
        if let Some(unknown) = input.permissions.iter().find(|c| Permission::from_codename(c).is_none()) {
            return Err(AuthError::Validation(format!("unknown permission {}", unknown)));
        }
        if let Some(existing) = self.repo.find_user_by_username(&input.username).await? {
            debug!("user exists: {}", existing.username);
            return Err(AuthError::Conflict);
        }

        let user = self.repo.create_user(&input.username, input.is_superuser).await?;
        let hash = hash_password(&input.password)?;
        self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        for codename in &input.permissions {
            self.repo.grant_permission(user.id, codename).await?;
        }
        info!(user_id = %user.id, is_superuser = user.is_superuser, "user_created");
        Ok(user)
    }

    /// Create the configured superuser unless an account with that name exists.
    /// Returns whether an account was created.
    #[instrument(skip(self, password))]
    pub async fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        if self.repo.find_user_by_username(username).await?.is_some() {
            return Ok(false);
        }
        self.create_user(NewUserInput {
            username: username.to_string(),
            password: password.to_string(),
            is_superuser: true,
            permissions: Vec::new(),
        })
        .await?;
        Ok(true)
    }

    /// Verify a password and issue a signed token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{NewUserInput, LoginInput};
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig::new("secret", 12));
    /// let _ = tokio_test::block_on(svc.create_user(NewUserInput { username: "u".into(), password: "Passw0rd".into(), is_superuser: true, permissions: vec![] }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { username: "u".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(svc.verify_token(&session.token).unwrap(), session.user.id);
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_username(&input.username)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }

        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims { sub: user.username.clone(), uid: user.id.to_string(), exp };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// User id carried by a valid, unexpired token.
    pub fn verify_token(&self, token: &str) -> Result<Uuid, AuthError> {
        verify_token(&self.cfg.jwt_secret, token)
    }
}

/// Token check that needs only the secret, for request middleware.
pub fn verify_token(secret: &str, token: &str) -> Result<Uuid, AuthError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
    Uuid::parse_str(&data.claims.uid).map_err(|e| AuthError::TokenError(e.to_string()))
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}
