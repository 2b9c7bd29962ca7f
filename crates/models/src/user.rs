use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user_permission;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub username: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Permission }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Permission => Entity::has_many(user_permission::Entity).into() }
    }
}

impl Related<user_permission::Entity> for Entity {
    fn to() -> RelationDef { Relation::Permission.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_username(username: &str) -> Result<(), ModelError> {
    let ok = !username.is_empty()
        && username.len() <= 150
        && username.chars().all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c));
    if !ok {
        return Err(ModelError::Validation("invalid username".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, username: &str, is_superuser: bool) -> Result<Model, ModelError> {
    validate_username(username)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        is_superuser: Set(is_superuser),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::validate_username;

    #[test]
    fn username_charset() {
        assert!(validate_username("ops.admin@example").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
    }
}
