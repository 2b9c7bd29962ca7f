use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::{Form, Query};
use minijinja::context;
use serde::{Deserialize, Serialize};

use models::errors::FieldErrors;
use models::tenant_group::{self, GroupFields};
use service::errors::ServiceError;
use service::export;
use service::permissions::{CurrentUser, Permission};
use service::tenant_group_service as groups;

use crate::errors::ViewError;
use crate::routes::helpers::{base_ctx, csv_response, is_set, render, slug_or_derived, BulkDeleteForm, PageQuery, CONFIRM_REQUIRED};
use crate::state::ServerState;

const LIST_URL: &str = "/tenancy/tenant-groups/";
const ADD_URL: &str = "/tenancy/tenant-groups/add/";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GroupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "_addanother", default, skip_serializing)]
    pub add_another: Option<String>,
}

impl GroupForm {
    fn fields(&self) -> GroupFields {
        GroupFields { name: self.name.clone(), slug: slug_or_derived(&self.slug, &self.name) }
    }
}

impl From<&tenant_group::Model> for GroupForm {
    fn from(g: &tenant_group::Model) -> Self {
        Self { name: g.name.clone(), slug: g.slug.clone(), add_another: None }
    }
}

fn edit_page(user: &CurrentUser, obj: Option<&tenant_group::Model>, form: &GroupForm, errors: &FieldErrors) -> Result<Response, ViewError> {
    Ok(render("tenantgroup_edit.html", context! { obj => obj, form => form, errors => errors, ..base_ctx(user) })?.into_response())
}

/// Tenant groups with their tenant counts.
pub async fn list(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<PageQuery>,
) -> Result<Response, ViewError> {
    if q.export.is_some() {
        let rows = groups::all_groups(&state.db).await?;
        return Ok(csv_response("tenant_groups.csv", export::groups_csv(&rows)?));
    }
    let page = groups::list_groups(&state.db, q.pagination(&state.pagination), state.pagination.max_per_page).await?;
    Ok(render("tenantgroup_list.html", context! { page => page, ..base_ctx(&user) })?.into_response())
}

pub async fn add_form(Extension(user): Extension<CurrentUser>) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenantGroup)?;
    edit_page(&user, None, &GroupForm::default(), &FieldErrors::new())
}

pub async fn add(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<GroupForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenantGroup)?;
    match groups::create_group(&state.db, &form.fields()).await {
        Ok(_) if is_set(&form.add_another) => Ok(Redirect::to(ADD_URL).into_response()),
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(ServiceError::Invalid(errors)) => edit_page(&user, None, &form, &errors),
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_form(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenantGroup)?;
    let obj = groups::get_group_by_slug(&state.db, &slug).await?;
    edit_page(&user, Some(&obj), &GroupForm::from(&obj), &FieldErrors::new())
}

pub async fn edit(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
    Form(form): Form<GroupForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::ChangeTenantGroup)?;
    match groups::update_group(&state.db, &slug, &form.fields()).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(ServiceError::Invalid(errors)) => {
            let obj = groups::get_group_by_slug(&state.db, &slug).await?;
            edit_page(&user, Some(&obj), &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// Confirm, then delete the selected groups.
pub async fn bulk_delete(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<BulkDeleteForm>,
) -> Result<Response, ViewError> {
    user.require(Permission::DeleteTenantGroup)?;
    let objects = groups::find_groups_by_ids(&state.db, &form.pk).await?;
    if objects.is_empty() {
        return Ok(Redirect::to(LIST_URL).into_response());
    }
    let mut error = "";
    if is_set(&form.submitted) {
        if is_set(&form.confirm) {
            let ids: Vec<_> = objects.iter().map(|g| g.id).collect();
            groups::bulk_delete_groups(&state.db, &ids).await?;
            return Ok(Redirect::to(LIST_URL).into_response());
        }
        error = CONFIRM_REQUIRED;
    }
    let ctx = context! {
        objects => objects,
        verbose_name_plural => "tenant groups",
        action => "/tenancy/tenant-groups/delete/",
        return_url => LIST_URL,
        error => error,
        ..base_ctx(&user)
    };
    Ok(render("bulk_delete.html", ctx)?.into_response())
}
