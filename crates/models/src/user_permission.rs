use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_permission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub codename: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Grant `codename` to the user; granting twice is a no-op.
pub async fn grant<C: ConnectionTrait>(db: &C, user_id: Uuid, codename: &str) -> Result<(), ModelError> {
    let existing = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Codename.eq(codename))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))?;
    if existing.is_some() {
        return Ok(());
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        codename: Set(codename.to_string()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(())
}

pub async fn codenames_for<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Vec<String>, ModelError> {
    let rows = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(rows.into_iter().map(|r| r.codename).collect())
}
