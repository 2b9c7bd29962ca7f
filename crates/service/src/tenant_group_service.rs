use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, JoinType, Select, Set,
    ActiveModelTrait, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::{Page, Pagination};
use models::errors::FieldErrors;
use models::tenant_group::{self, GroupFields};
use models::tenant;
use crate::errors::ServiceError;

/// Tenant group annotated with the number of tenants in it.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct TenantGroupRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub tenant_count: i64,
}

fn counted() -> Select<tenant_group::Entity> {
    tenant_group::Entity::find()
        .select_only()
        .column(tenant_group::Column::Id)
        .column(tenant_group::Column::Name)
        .column(tenant_group::Column::Slug)
        .column_as(tenant::Column::Id.count(), "tenant_count")
        .join(JoinType::LeftJoin, tenant_group::Relation::Tenant.def())
        .group_by(tenant_group::Column::Id)
        .group_by(tenant_group::Column::Name)
        .group_by(tenant_group::Column::Slug)
        .order_by_asc(tenant_group::Column::Name)
}

/// Every group with its tenant count, ordered by name.
pub async fn all_groups<C: ConnectionTrait>(db: &C) -> Result<Vec<TenantGroupRow>, ServiceError> {
    Ok(counted().into_model::<TenantGroupRow>().all(db).await?)
}

/// One page of groups with their tenant counts.
pub async fn list_groups<C: ConnectionTrait>(db: &C, opts: Pagination, max_per_page: u32) -> Result<Page<TenantGroupRow>, ServiceError> {
    let (page_idx, per_page) = opts.normalize_with_max(max_per_page);
    let paginator = counted().into_model::<TenantGroupRow>().paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page {
        items,
        page: page_idx + 1,
        per_page,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

pub async fn get_group_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> Result<tenant_group::Model, ServiceError> {
    tenant_group::find_by_slug(db, slug).await?.ok_or_else(|| ServiceError::not_found("tenant group"))
}

async fn check_unique<C: ConnectionTrait>(db: &C, fields: &GroupFields, exclude: Option<Uuid>) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::new();
    let clashes = |m: &tenant_group::Model| Some(m.id) != exclude;
    if tenant_group::find_by_name(db, fields.name.trim()).await?.as_ref().is_some_and(clashes) {
        errors.add("name", "Tenant group with this Name already exists.");
    }
    if tenant_group::find_by_slug(db, &fields.slug).await?.as_ref().is_some_and(clashes) {
        errors.add("slug", "Tenant group with this Slug already exists.");
    }
    errors.into_result()?;
    Ok(())
}

#[instrument(skip(db, fields), fields(slug = %fields.slug))]
pub async fn create_group(db: &DatabaseConnection, fields: &GroupFields) -> Result<tenant_group::Model, ServiceError> {
    fields.validate()?;
    check_unique(db, fields, None).await?;
    let created = tenant_group::create(db, fields).await?;
    info!(group_id = %created.id, "tenant_group_created");
    Ok(created)
}

#[instrument(skip(db, fields), fields(slug = %slug))]
pub async fn update_group(db: &DatabaseConnection, slug: &str, fields: &GroupFields) -> Result<tenant_group::Model, ServiceError> {
    let existing = get_group_by_slug(db, slug).await?;
    fields.validate()?;
    check_unique(db, fields, Some(existing.id)).await?;
    let mut am: tenant_group::ActiveModel = existing.into();
    am.name = Set(fields.name.trim().to_string());
    am.slug = Set(fields.slug.clone());
    let updated = am.update(db).await?;
    info!(group_id = %updated.id, "tenant_group_updated");
    Ok(updated)
}

pub async fn find_groups_by_ids<C: ConnectionTrait>(db: &C, ids: &[Uuid]) -> Result<Vec<tenant_group::Model>, ServiceError> {
    Ok(tenant_group::Entity::find()
        .filter(tenant_group::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(tenant_group::Column::Name)
        .all(db)
        .await?)
}

/// Delete the selected groups; their tenants become ungrouped.
#[instrument(skip(db, ids), fields(count = ids.len()))]
pub async fn bulk_delete_groups(db: &DatabaseConnection, ids: &[Uuid]) -> Result<u64, ServiceError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let txn = db.begin().await?;
    tenant::Entity::update_many()
        .col_expr(tenant::Column::GroupId, Expr::value(Option::<Uuid>::None))
        .filter(tenant::Column::GroupId.is_in(ids.iter().copied()))
        .exec(&txn)
        .await?;
    let res = tenant_group::Entity::delete_many()
        .filter(tenant_group::Column::Id.is_in(ids.iter().copied()))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    info!(deleted = res.rows_affected, "tenant_groups_deleted");
    Ok(res.rows_affected)
}
