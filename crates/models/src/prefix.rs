use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, tenant, vrf};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prefix")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// CIDR notation, e.g. `10.0.0.0/16`.
    pub prefix: String,
    pub vrf_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Vrf, Tenant }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Vrf => Entity::belongs_to(vrf::Entity)
                .from(Column::VrfId)
                .to(vrf::Column::Id)
                .into(),
            Relation::Tenant => Entity::belongs_to(tenant::Entity)
                .from(Column::TenantId)
                .to(tenant::Column::Id)
                .into(),
        }
    }
}

impl Related<vrf::Entity> for Entity {
    fn to() -> RelationDef { Relation::Vrf.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    prefix: &str,
    vrf_id: Option<Uuid>,
    tenant_id: Option<Uuid>,
) -> Result<Model, ModelError> {
    crate::validation::parse_cidr(prefix).map_err(ModelError::Validation)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        prefix: Set(prefix.to_string()),
        vrf_id: Set(vrf_id),
        tenant_id: Set(tenant_id),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
