use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{FieldErrors, ModelError};
use crate::{tenant, validation};

pub const NAME_MAX_LEN: usize = 50;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Tenant }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Tenant => Entity::has_many(tenant::Entity).into() }
    }
}

impl Related<tenant::Entity> for Entity {
    fn to() -> RelationDef { Relation::Tenant.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Editable fields of a tenant group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFields {
    pub name: String,
    pub slug: String,
}

impl GroupFields {
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        validation::check_required(&mut errors, "name", &self.name, NAME_MAX_LEN);
        validation::check_slug(&mut errors, "slug", &self.slug);
        errors.into_result()
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, fields: &GroupFields) -> Result<Model, ModelError> {
    fields.validate()?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(fields.name.trim().to_string()),
        slug: Set(fields.slug.clone()),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn find_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}
