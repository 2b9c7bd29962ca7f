use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, SelectTwo, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::{Page, Pagination};
use models::errors::{FieldErrors, ModelError};
use models::tenant::{self, TenantFields};
use models::tenant_group;
use crate::errors::ServiceError;
use crate::stats;

/// Query-string filters of the tenant list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantFilter {
    /// Case-insensitive substring of name, description or comments.
    pub q: Option<String>,
    /// Group slugs.
    pub group: Vec<String>,
    pub group_id: Vec<Uuid>,
}

impl TenantFilter {
    fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TenantRow {
    pub tenant: tenant::Model,
    pub group: Option<tenant_group::Model>,
}

impl From<(tenant::Model, Option<tenant_group::Model>)> for TenantRow {
    fn from((tenant, group): (tenant::Model, Option<tenant_group::Model>)) -> Self {
        Self { tenant, group }
    }
}

/// Escape `LIKE` wildcards so the search matches literally.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn filtered(filter: &TenantFilter) -> SelectTwo<tenant::Entity, tenant_group::Entity> {
    let mut query = tenant::Entity::find().find_also_related(tenant_group::Entity);
    if let Some(q) = filter.search() {
        let pattern = format!("%{}%", escape_like(&q.to_lowercase()));
        let lower = |col: tenant::Column| Expr::expr(Func::lower(Expr::col((tenant::Entity, col))));
        let like = || LikeExpr::new(pattern.clone()).escape('\\');
        query = query.filter(
            Condition::any()
                .add(lower(tenant::Column::Name).like(like()))
                .add(lower(tenant::Column::Description).like(like()))
                .add(lower(tenant::Column::Comments).like(like())),
        );
    }
    if !filter.group.is_empty() {
        query = query.filter(tenant_group::Column::Slug.is_in(filter.group.iter().cloned()));
    }
    if !filter.group_id.is_empty() {
        query = query.filter(tenant::Column::GroupId.is_in(filter.group_id.iter().copied()));
    }
    query
        .order_by_asc(tenant_group::Column::Name)
        .order_by_asc(tenant::Column::Name)
}

/// One page of tenants with their groups, ordered by group then name.
pub async fn list_tenants<C: ConnectionTrait>(
    db: &C,
    filter: &TenantFilter,
    opts: Pagination,
    max_per_page: u32,
) -> Result<Page<TenantRow>, ServiceError> {
    let (page_idx, per_page) = opts.normalize_with_max(max_per_page);
    let paginator = filtered(filter).paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page {
        items: items.into_iter().map(TenantRow::from).collect(),
        page: page_idx + 1,
        per_page,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Every tenant matching the filter, for export.
pub async fn all_tenants<C: ConnectionTrait>(db: &C, filter: &TenantFilter) -> Result<Vec<TenantRow>, ServiceError> {
    let rows = filtered(filter).all(db).await?;
    Ok(rows.into_iter().map(TenantRow::from).collect())
}

pub async fn get_tenant_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> Result<tenant::Model, ServiceError> {
    tenant::find_by_slug(db, slug).await?.ok_or_else(|| ServiceError::not_found("tenant"))
}

/// Tenant plus its group, looked up by slug.
pub async fn get_tenant_row<C: ConnectionTrait>(db: &C, slug: &str) -> Result<TenantRow, ServiceError> {
    tenant::Entity::find()
        .filter(tenant::Column::Slug.eq(slug))
        .find_also_related(tenant_group::Entity)
        .one(db)
        .await?
        .map(TenantRow::from)
        .ok_or_else(|| ServiceError::not_found("tenant"))
}

pub async fn find_tenants_by_ids<C: ConnectionTrait>(db: &C, ids: &[Uuid]) -> Result<Vec<tenant::Model>, ServiceError> {
    Ok(tenant::Entity::find()
        .filter(tenant::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(tenant::Column::Name)
        .all(db)
        .await?)
}

/// Field rules plus uniqueness and group existence, collected per field.
async fn check_tenant<C: ConnectionTrait>(db: &C, fields: &TenantFields, exclude: Option<Uuid>) -> Result<(), ServiceError> {
    let mut errors = match fields.validate() {
        Ok(()) => FieldErrors::new(),
        Err(ModelError::Invalid(errors)) => errors,
        Err(e) => return Err(e.into()),
    };
    let clashes = |m: &tenant::Model| Some(m.id) != exclude;
    if !errors.has("name") && tenant::find_by_name(db, fields.name.trim()).await?.as_ref().is_some_and(clashes) {
        errors.add("name", "Tenant with this Name already exists.");
    }
    if !errors.has("slug") && tenant::find_by_slug(db, &fields.slug).await?.as_ref().is_some_and(clashes) {
        errors.add("slug", "Tenant with this Slug already exists.");
    }
    if let Some(group_id) = fields.group_id {
        if tenant_group::Entity::find_by_id(group_id).one(db).await?.is_none() {
            errors.add("group", "Select a valid choice. That choice is not one of the available choices.");
        }
    }
    errors.into_result()?;
    Ok(())
}

#[instrument(skip(db, fields), fields(slug = %fields.slug))]
pub async fn create_tenant(db: &DatabaseConnection, fields: &TenantFields) -> Result<tenant::Model, ServiceError> {
    check_tenant(db, fields, None).await?;
    let created = tenant::create(db, fields).await?;
    info!(tenant_id = %created.id, "tenant_created");
    Ok(created)
}

#[instrument(skip(db, fields), fields(slug = %slug))]
pub async fn update_tenant(db: &DatabaseConnection, slug: &str, fields: &TenantFields) -> Result<tenant::Model, ServiceError> {
    let existing = get_tenant_by_slug(db, slug).await?;
    check_tenant(db, fields, Some(existing.id)).await?;
    let mut am: tenant::ActiveModel = existing.into();
    fields.apply(&mut am);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(tenant_id = %updated.id, "tenant_updated");
    Ok(updated)
}

fn protected_message(name: &str, owned: &stats::TenantStats) -> String {
    let parts: Vec<String> = owned.non_zero().into_iter().map(|(label, n)| format!("{} {}", n, label)).collect();
    format!("{} is still referenced by {}", name, parts.join(", "))
}

/// Delete a tenant that owns no related objects.
#[instrument(skip(db), fields(slug = %slug))]
pub async fn delete_tenant(db: &DatabaseConnection, slug: &str) -> Result<tenant::Model, ServiceError> {
    let existing = get_tenant_by_slug(db, slug).await?;
    let owned = stats::owned_objects(db, existing.id).await?;
    if !owned.is_empty() {
        return Err(ServiceError::Protected(protected_message(&existing.name, &owned)));
    }
    tenant::Entity::delete_by_id(existing.id).exec(db).await?;
    info!(tenant_id = %existing.id, "tenant_deleted");
    Ok(existing)
}

/// Group assignment requested by the bulk edit form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupChange {
    Keep,
    Clear,
    Set(Uuid),
}

impl GroupChange {
    /// Empty keeps the current group, `none` clears it, a group id sets it.
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        match value.trim() {
            "" => Ok(Self::Keep),
            v if v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("null") => Ok(Self::Clear),
            v => Uuid::parse_str(v)
                .map(Self::Set)
                .map_err(|_| ServiceError::field("group", "Select a valid choice.")),
        }
    }
}

/// Apply `change` to every selected tenant; returns the number of rows touched.
#[instrument(skip(db, ids), fields(count = ids.len()))]
pub async fn bulk_edit_tenants(db: &DatabaseConnection, ids: &[Uuid], change: GroupChange) -> Result<u64, ServiceError> {
    let group_id = match change {
        GroupChange::Keep => return Ok(0),
        GroupChange::Clear => None,
        GroupChange::Set(id) => {
            if tenant_group::Entity::find_by_id(id).one(db).await?.is_none() {
                return Err(ServiceError::field("group", "Select a valid choice. That choice is not one of the available choices."));
            }
            Some(id)
        }
    };
    if ids.is_empty() {
        return Ok(0);
    }
    let txn = db.begin().await?;
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let res = tenant::Entity::update_many()
        .col_expr(tenant::Column::GroupId, Expr::value(group_id))
        .col_expr(tenant::Column::UpdatedAt, Expr::value(now))
        .filter(tenant::Column::Id.is_in(ids.iter().copied()))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    info!(updated = res.rows_affected, "tenants_bulk_edited");
    Ok(res.rows_affected)
}

/// Delete the selected tenants, refusing the whole batch if any owns related objects.
#[instrument(skip(db, ids), fields(count = ids.len()))]
pub async fn bulk_delete_tenants(db: &DatabaseConnection, ids: &[Uuid]) -> Result<u64, ServiceError> {
    let selected = find_tenants_by_ids(db, ids).await?;
    let mut blocked = Vec::new();
    for t in &selected {
        let owned = stats::owned_objects(db, t.id).await?;
        if !owned.is_empty() {
            blocked.push(protected_message(&t.name, &owned));
        }
    }
    if !blocked.is_empty() {
        return Err(ServiceError::Protected(blocked.join("; ")));
    }
    if selected.is_empty() {
        return Ok(0);
    }
    let txn = db.begin().await?;
    let res = tenant::Entity::delete_many()
        .filter(tenant::Column::Id.is_in(selected.iter().map(|t| t.id)))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    info!(deleted = res.rows_affected, "tenants_bulk_deleted");
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, tenant_fields};
    use models::{site, tenant_group::GroupFields};

    async fn seed(db: &DatabaseConnection) -> Result<tenant_group::Model, anyhow::Error> {
        let g = tenant_group::create(db, &GroupFields { name: "Customers".into(), slug: "customers".into() }).await?;
        let mut a = tenant_fields("Zeta", "zeta");
        a.group_id = Some(g.id);
        a.description = "Primary customer".into();
        create_tenant(db, &a).await?;
        let mut b = tenant_fields("Acme", "acme");
        b.group_id = Some(g.id);
        create_tenant(db, &b).await?;
        let mut c = tenant_fields("Loose", "loose");
        c.comments = "no group yet".into();
        create_tenant(db, &c).await?;
        Ok(g)
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("acme"), "acme");
    }

    fn names(rows: &[TenantRow]) -> Vec<&str> {
        rows.iter().map(|r| r.tenant.name.as_str()).collect()
    }

    #[tokio::test]
    async fn list_filters_by_group_and_search() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let g = seed(&db).await?;

        let by_slug = TenantFilter { group: vec!["customers".into()], ..Default::default() };
        assert_eq!(names(&all_tenants(&db, &by_slug).await?), vec!["Acme", "Zeta"]);

        let by_id = TenantFilter { group_id: vec![g.id], ..Default::default() };
        assert_eq!(all_tenants(&db, &by_id).await?.len(), 2);

        let search = TenantFilter { q: Some("PRIMARY".into()), ..Default::default() };
        assert_eq!(names(&all_tenants(&db, &search).await?), vec!["Zeta"]);

        let comments = TenantFilter { q: Some("group yet".into()), ..Default::default() };
        assert_eq!(names(&all_tenants(&db, &comments).await?), vec!["Loose"]);

        for wildcard in ["_", "%", "\\"] {
            let literal = TenantFilter { q: Some(wildcard.into()), ..Default::default() };
            assert!(all_tenants(&db, &literal).await?.is_empty(), "{} matched", wildcard);
        }

        let page = list_tenants(&db, &TenantFilter::default(), Pagination { page: 1, per_page: 2 }, 1000).await?;
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn create_reports_uniqueness_and_unknown_group() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        seed(&db).await?;
        let mut dup = tenant_fields("Acme", "acme");
        dup.group_id = Some(Uuid::new_v4());
        match create_tenant(&db, &dup).await {
            Err(ServiceError::Invalid(errors)) => {
                assert!(errors.has("name"));
                assert!(errors.has("slug"));
                assert!(errors.has("group"));
            }
            other => panic!("expected field errors, got {:?}", other),
        }
        assert_eq!(all_tenants(&db, &TenantFilter::default()).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_identity() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        seed(&db).await?;
        let before = get_tenant_by_slug(&db, "acme").await?;
        let mut f = tenant_fields("Acme Corp", "acme-corp");
        f.description = "renamed".into();
        let after = update_tenant(&db, "acme", &f).await?;
        assert_eq!(after.id, before.id);
        assert_eq!(after.slug, "acme-corp");
        assert!(matches!(get_tenant_by_slug(&db, "acme").await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_from_list_unless_protected() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        seed(&db).await?;
        delete_tenant(&db, "zeta").await?;
        let remaining = all_tenants(&db, &TenantFilter::default()).await?;
        assert_eq!(remaining.len(), 2);
        assert!(!names(&remaining).contains(&"Zeta"));

        let acme = get_tenant_by_slug(&db, "acme").await?;
        site::create(&db, "DC1", "dc1", Some(acme.id)).await?;
        match delete_tenant(&db, "acme").await {
            Err(ServiceError::Protected(msg)) => assert!(msg.contains("1 sites")),
            other => panic!("expected protected, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn bulk_edit_sets_and_clears_group() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let g = seed(&db).await?;
        let loose = get_tenant_by_slug(&db, "loose").await?;
        let acme = get_tenant_by_slug(&db, "acme").await?;

        assert_eq!(bulk_edit_tenants(&db, &[loose.id], GroupChange::Set(g.id)).await?, 1);
        assert_eq!(get_tenant_by_slug(&db, "loose").await?.group_id, Some(g.id));

        assert_eq!(bulk_edit_tenants(&db, &[loose.id, acme.id], GroupChange::Clear).await?, 2);
        assert_eq!(get_tenant_by_slug(&db, "acme").await?.group_id, None);

        assert_eq!(bulk_edit_tenants(&db, &[acme.id], GroupChange::Keep).await?, 0);
        assert!(bulk_edit_tenants(&db, &[acme.id], GroupChange::Set(Uuid::new_v4())).await.is_err());
        Ok(())
    }

    #[test]
    fn group_change_parsing() {
        assert_eq!(GroupChange::parse("").ok(), Some(GroupChange::Keep));
        assert_eq!(GroupChange::parse("none").ok(), Some(GroupChange::Clear));
        let id = Uuid::new_v4();
        assert_eq!(GroupChange::parse(&id.to_string()).ok(), Some(GroupChange::Set(id)));
        assert!(GroupChange::parse("bogus").is_err());
    }

    #[tokio::test]
    async fn bulk_delete_is_all_or_nothing() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        seed(&db).await?;
        let all: Vec<Uuid> = all_tenants(&db, &TenantFilter::default()).await?.iter().map(|r| r.tenant.id).collect();
        let zeta = get_tenant_by_slug(&db, "zeta").await?;
        site::create(&db, "DC1", "dc1", Some(zeta.id)).await?;

        assert!(matches!(bulk_delete_tenants(&db, &all).await, Err(ServiceError::Protected(_))));
        assert_eq!(all_tenants(&db, &TenantFilter::default()).await?.len(), 3);

        let rest: Vec<Uuid> = all.into_iter().filter(|id| *id != zeta.id).collect();
        assert_eq!(bulk_delete_tenants(&db, &rest).await?, 2);
        assert_eq!(names(&all_tenants(&db, &TenantFilter::default()).await?), vec!["Zeta"]);
        Ok(())
    }
}
