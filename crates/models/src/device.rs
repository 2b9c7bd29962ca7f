use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, site, tenant};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: Option<String>,
    pub site_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Site, Tenant }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Site => Entity::belongs_to(site::Entity)
                .from(Column::SiteId)
                .to(site::Column::Id)
                .into(),
            Relation::Tenant => Entity::belongs_to(tenant::Entity)
                .from(Column::TenantId)
                .to(tenant::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Devices may be unnamed; blank names are stored as NULL.
pub async fn create<C: ConnectionTrait>(db: &C, name: Option<&str>, site_id: Uuid, tenant_id: Option<Uuid>) -> Result<Model, ModelError> {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        site_id: Set(site_id),
        tenant_id: Set(tenant_id),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
