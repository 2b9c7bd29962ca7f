use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::{Form, Query};
use minijinja::context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::errors::{FieldErrors, ModelError};
use models::tenant::{self, TenantFields};
use service::errors::ServiceError;
use service::permissions::{CurrentUser, Permission};
use service::tenant_service::{self as tenants, GroupChange, TenantFilter};
use service::{export, import, stats, tenant_group_service as groups};

use crate::errors::ViewError;
use crate::routes::helpers::{base_ctx, csv_response, is_set, render, slug_or_derived, BulkDeleteForm, PageQuery, CONFIRM_REQUIRED};
use crate::state::ServerState;

const LIST_URL: &str = "/tenancy/tenants/";
const ADD_URL: &str = "/tenancy/tenants/add/";

/// List query: paging plus the filter form.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub export: Option<String>,
    pub q: Option<String>,
    #[serde(default)]
    pub group: Vec<String>,
    #[serde(default)]
    pub group_id: Vec<Uuid>,
}

impl ListQuery {
    fn paging(&self) -> PageQuery {
        PageQuery { page: self.page, per_page: self.per_page, export: self.export.clone() }
    }

    fn filter(&self) -> TenantFilter {
        TenantFilter { q: self.q.clone(), group: self.group.clone(), group_id: self.group_id.clone() }
    }

    /// Filter parameters re-encoded for paging and export links, ending in `&` when non-empty.
    fn filter_query(&self) -> Result<String, serde_urlencoded::ser::Error> {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        pairs.extend(self.group.iter().map(|g| ("group", g.clone())));
        pairs.extend(self.group_id.iter().map(|id| ("group_id", id.to_string())));
        let mut out = serde_urlencoded::to_string(&pairs)?;
        if !out.is_empty() {
            out.push('&');
        }
        Ok(out)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TenantForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    #[serde(rename = "_addanother", default, skip_serializing)]
    pub add_another: Option<String>,
}

impl TenantForm {
    /// Fields to save, or every problem found including an unparsable group.
    fn fields(&self) -> Result<TenantFields, FieldErrors> {
        let group = self.group.trim();
        let group_id = if group.is_empty() { Ok(None) } else { Uuid::parse_str(group).map(Some) };
        let fields = TenantFields {
            name: self.name.clone(),
            slug: slug_or_derived(&self.slug, &self.name),
            group_id: group_id.as_ref().ok().copied().flatten(),
            description: self.description.clone(),
            comments: self.comments.clone(),
        };
        if group_id.is_ok() {
            return Ok(fields);
        }
        let mut errors = FieldErrors::new();
        errors.add("group", "Select a valid choice. That choice is not one of the available choices.");
        if let Err(ModelError::Invalid(more)) = fields.validate() {
            errors.merge(more);
        }
        Err(errors)
    }
}

impl From<&tenant::Model> for TenantForm {
    fn from(t: &tenant::Model) -> Self {
        Self {
            name: t.name.clone(),
            slug: t.slug.clone(),
            group: t.group_id.map(|g| g.to_string()).unwrap_or_default(),
            description: t.description.clone(),
            comments: t.comments.clone(),
            add_another: None,
        }
    }
}

async fn edit_page(
    state: &ServerState,
    user: &CurrentUser,
    obj: Option<&tenant::Model>,
    form: &TenantForm,
    errors: &FieldErrors,
) -> Result<Response, ViewError> {
    let group_choices = groups::all_groups(&state.db).await?;
    let ctx = context! { obj => obj, form => form, errors => errors, groups => group_choices, ..base_ctx(user) };
    Ok(render("tenant_edit.html", ctx)?.into_response())
}

/// Tenants joined with their group, filtered by the query string.
pub async fn list(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<ListQuery>,
) -> Result<Response, ViewError> {
    let filter = q.filter();
    if q.export.is_some() {
        let rows = tenants::all_tenants(&state.db, &filter).await?;
        return Ok(csv_response("tenants.csv", export::tenants_csv(&rows)?));
    }
    let page = tenants::list_tenants(&state.db, &filter, q.paging().pagination(&state.pagination), state.pagination.max_per_page).await?;
    let group_choices = groups::all_groups(&state.db).await?;
    let ctx = context! {
        page => page,
        groups => group_choices,
        filter => context! { q => filter.q.clone().unwrap_or_default(), group => filter.group.clone() },
        filter_query => q.filter_query().map_err(|e| ViewError::Internal(e.to_string()))?,
        ..base_ctx(&user)
    };
    Ok(render("tenant_list.html", ctx)?.into_response())
}

/// Tenant page with related-object counts.
pub async fn detail(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Response, ViewError> {
    let row = tenants::get_tenant_row(&state.db, &slug).await?;
    let stats = stats::tenant_stats(&state.db, row.tenant.id).await?;
    let ctx = context! { tenant => row.tenant, group => row.group, stats => stats, ..base_ctx(&user) };
    Ok(render("tenant.html", ctx)?.into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct AddQuery {
    #[serde(default)]
    pub group: String,
}

pub async fn add_form(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<AddQuery>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenant)?;
    let form = TenantForm { group: q.group, ..Default::default() };
    edit_page(&state, &user, None, &form, &FieldErrors::new()).await
}

pub async fn add(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<TenantForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenant)?;
    let fields = match form.fields() {
        Ok(f) => f,
        Err(errors) => return edit_page(&state, &user, None, &form, &errors).await,
    };
    match tenants::create_tenant(&state.db, &fields).await {
        Ok(_) if is_set(&form.add_another) => Ok(Redirect::to(ADD_URL).into_response()),
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(ServiceError::Invalid(errors)) => edit_page(&state, &user, None, &form, &errors).await,
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_form(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenant)?;
    let obj = tenants::get_tenant_by_slug(&state.db, &slug).await?;
    edit_page(&state, &user, Some(&obj), &TenantForm::from(&obj), &FieldErrors::new()).await
}

pub async fn edit(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
    Form(form): Form<TenantForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenant)?;
    let obj = tenants::get_tenant_by_slug(&state.db, &slug).await?;
    let fields = match form.fields() {
        Ok(f) => f,
        Err(errors) => return edit_page(&state, &user, Some(&obj), &form, &errors).await,
    };
    match tenants::update_tenant(&state.db, &slug, &fields).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(ServiceError::Invalid(errors)) => edit_page(&state, &user, Some(&obj), &form, &errors).await,
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {
    pub confirm: Option<String>,
}

fn delete_page(user: &CurrentUser, obj: &tenant::Model, error: &str) -> Result<Response, ViewError> {
    let return_url = format!("/tenancy/tenants/{}/", obj.slug);
    let ctx = context! { obj => obj, verbose_name => "tenant", return_url => return_url, error => error, ..base_ctx(user) };
    Ok(render("object_delete.html", ctx)?.into_response())
}

pub async fn delete_form(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Response, ViewError> {
    user.require(Permission::DeleteTenant)?;
    let obj = tenants::get_tenant_by_slug(&state.db, &slug).await?;
    delete_page(&user, &obj, "")
}

pub async fn delete(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::DeleteTenant)?;
    if !is_set(&form.confirm) {
        let obj = tenants::get_tenant_by_slug(&state.db, &slug).await?;
        return delete_page(&user, &obj, CONFIRM_REQUIRED);
    }
    tenants::delete_tenant(&state.db, &slug).await?;
    Ok(Redirect::to(LIST_URL).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportForm {
    #[serde(default)]
    pub csv: String,
}

fn import_page(user: &CurrentUser, csv: &str, errors: &FieldErrors) -> Result<Response, ViewError> {
    Ok(render("tenant_import.html", context! { csv => csv, errors => errors, ..base_ctx(user) })?.into_response())
}

pub async fn import_form(Extension(user): Extension<CurrentUser>) -> Result<Response, ViewError> {
    user.require(Permission::AddTenant)?;
    import_page(&user, "", &FieldErrors::new())
}

pub async fn import(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<ImportForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::AddTenant)?;
    match import::import_tenants(&state.db, &form.csv).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(ServiceError::Invalid(errors)) => import_page(&user, &form.csv, &errors),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkEditForm {
    #[serde(default)]
    pub pk: Vec<Uuid>,
    #[serde(rename = "_apply")]
    pub apply: Option<String>,
    #[serde(default)]
    pub group: String,
}

/// Reassign the group of the selected tenants.
pub async fn bulk_edit(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<BulkEditForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenant)?;
    let objects = tenants::find_tenants_by_ids(&state.db, &form.pk).await?;
    if objects.is_empty() {
        return Ok(Redirect::to(LIST_URL).into_response());
    }
    let mut errors = FieldErrors::new();
    if is_set(&form.apply) {
        let ids: Vec<Uuid> = objects.iter().map(|t| t.id).collect();
        let applied = match GroupChange::parse(&form.group) {
            Ok(change) => tenants::bulk_edit_tenants(&state.db, &ids, change).await,
            Err(e) => Err(e),
        };
        match applied {
            Ok(_) => return Ok(Redirect::to(LIST_URL).into_response()),
            Err(ServiceError::Invalid(e)) => errors = e,
            Err(e) => return Err(e.into()),
        }
    }
    let group_choices = groups::all_groups(&state.db).await?;
    let ctx = context! {
        objects => objects,
        groups => group_choices,
        group => form.group,
        errors => errors,
        ..base_ctx(&user)
    };
    Ok(render("tenant_bulk_edit.html", ctx)?.into_response())
}

/// Confirm, then delete the selected tenants.
pub async fn bulk_delete(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<BulkDeleteForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::DeleteTenant)?;
    let objects = tenants::find_tenants_by_ids(&state.db, &form.pk).await?;
    if objects.is_empty() {
        return Ok(Redirect::to(LIST_URL).into_response());
    }
    let mut error = "";
    if is_set(&form.submitted) {
        if is_set(&form.confirm) {
            let ids: Vec<Uuid> = objects.iter().map(|t| t.id).collect();
            tenants::bulk_delete_tenants(&state.db, &ids).await?;
            return Ok(Redirect::to(LIST_URL).into_response());
        }
        error = CONFIRM_REQUIRED;
    }
    let ctx = context! {
        objects => objects,
        verbose_name_plural => "tenants",
        action => "/tenancy/tenants/delete/",
        return_url => LIST_URL,
        error => error,
        ..base_ctx(&user)
    };
    Ok(render("bulk_delete.html", ctx)?.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_with_bad_group_collects_all_errors() {
        let form = TenantForm { name: String::new(), slug: "ok".into(), group: "not-a-uuid".into(), ..Default::default() };
        let errors = form.fields().unwrap_err();
        assert!(errors.has("group"));
        assert!(errors.has("name"));
    }

    #[test]
    fn empty_group_means_ungrouped() {
        let form = TenantForm { name: "Acme".into(), slug: " acme ".into(), ..Default::default() };
        let fields = form.fields().unwrap();
        assert_eq!(fields.group_id, None);
        assert_eq!(fields.slug, "acme");
    }

    #[test]
    fn blank_slug_is_derived_from_name() {
        let form = TenantForm { name: "Acme Corp. (East)".into(), slug: "  ".into(), ..Default::default() };
        assert_eq!(form.fields().unwrap().slug, "acme-corp-east");
    }

    #[test]
    fn filter_query_is_encoded() {
        let q = ListQuery { q: Some("a&b c".into()), group: vec!["customers".into()], ..Default::default() };
        assert_eq!(q.filter_query().unwrap(), "q=a%26b+c&group=customers&");
        assert_eq!(ListQuery::default().filter_query().unwrap(), "");
    }
}
