//! Permission codenames and the request principal.

use std::collections::HashSet;

use sea_orm::{ConnectionTrait, EntityTrait};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use models::{user, user_permission};
use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    ChangeTenantGroup,
    DeleteTenantGroup,
    AddTenant,
    ChangeTenant,
    DeleteTenant,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::ChangeTenantGroup,
        Permission::DeleteTenantGroup,
        Permission::AddTenant,
        Permission::ChangeTenant,
        Permission::DeleteTenant,
    ];

    pub fn codename(self) -> &'static str {
        match self {
            Permission::ChangeTenantGroup => "tenancy.change_tenantgroup",
            Permission::DeleteTenantGroup => "tenancy.delete_tenantgroup",
            Permission::AddTenant => "tenancy.add_tenant",
            Permission::ChangeTenant => "tenancy.change_tenant",
            Permission::DeleteTenant => "tenancy.delete_tenant",
        }
    }

    pub fn from_codename(codename: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.codename() == codename)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("missing permission {}", .0.codename())]
    Forbidden(Permission),
}

/// Logged-in user with the codenames granted to it.
#[derive(Clone, Debug, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub is_superuser: bool,
    pub permissions: HashSet<String>,
}

#[derive(Clone, Debug, Default)]
pub enum CurrentUser {
    #[default]
    Anonymous,
    User(Principal),
}

impl CurrentUser {
    pub fn username(&self) -> Option<&str> {
        match self {
            CurrentUser::User(p) => Some(p.username.as_str()),
            CurrentUser::Anonymous => None,
        }
    }

    pub fn has_perm(&self, perm: Permission) -> bool {
        match self {
            CurrentUser::Anonymous => false,
            CurrentUser::User(p) => p.is_superuser || p.permissions.contains(perm.codename()),
        }
    }

    pub fn require(&self, perm: Permission) -> Result<(), AccessError> {
        match self {
            _ if self.has_perm(perm) => Ok(()),
            CurrentUser::Anonymous => Err(AccessError::Unauthenticated),
            CurrentUser::User(_) => Err(AccessError::Forbidden(perm)),
        }
    }
}

/// Load an active user and its codenames; `None` if missing or disabled.
pub async fn load_principal<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Option<Principal>, ServiceError> {
    let Some(u) = user::Entity::find_by_id(user_id).one(db).await? else { return Ok(None) };
    if !u.is_active {
        return Ok(None);
    }
    let permissions = user_permission::codenames_for(db, u.id).await?.into_iter().collect();
    Ok(Some(Principal { id: u.id, username: u.username, is_superuser: u.is_superuser, permissions }))
}
