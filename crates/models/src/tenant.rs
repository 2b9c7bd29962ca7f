use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{FieldErrors, ModelError};
use crate::{tenant_group, validation};

pub const NAME_MAX_LEN: usize = 30;
pub const DESCRIPTION_MAX_LEN: usize = 100;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub group_id: Option<Uuid>,
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub comments: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Group }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Group => Entity::belongs_to(tenant_group::Entity)
                .from(Column::GroupId)
                .to(tenant_group::Column::Id)
                .into(),
        }
    }
}

impl Related<tenant_group::Entity> for Entity {
    fn to() -> RelationDef { Relation::Group.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Editable fields of a tenant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantFields {
    pub name: String,
    pub slug: String,
    pub group_id: Option<Uuid>,
    pub description: String,
    pub comments: String,
}

impl TenantFields {
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        validation::check_required(&mut errors, "name", &self.name, NAME_MAX_LEN);
        validation::check_slug(&mut errors, "slug", &self.slug);
        validation::check_max_len(&mut errors, "description", &self.description, DESCRIPTION_MAX_LEN);
        errors.into_result()
    }

    /// Copy the fields onto an active model, leaving identity and timestamps alone.
    pub fn apply(&self, am: &mut ActiveModel) {
        am.name = Set(self.name.trim().to_string());
        am.slug = Set(self.slug.clone());
        am.group_id = Set(self.group_id);
        am.description = Set(self.description.trim().to_string());
        am.comments = Set(self.comments.clone());
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, fields: &TenantFields) -> Result<Model, ModelError> {
    fields.validate()?;
    let now = Utc::now().into();
    let mut am = ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    fields.apply(&mut am);
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
