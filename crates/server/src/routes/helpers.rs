//! Pieces shared by the tenancy views.

use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use minijinja::{context, Value};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use configs::PaginationConfig;
use service::permissions::{CurrentUser, Permission};

use crate::errors::ViewError;
use crate::templates;

/// Variables every page needs: who is logged in and what they may do.
pub fn base_ctx(user: &CurrentUser) -> Value {
    context! {
        request_user => user.username(),
        perms => context! {
            change_tenantgroup => user.has_perm(Permission::ChangeTenantGroup),
            delete_tenantgroup => user.has_perm(Permission::DeleteTenantGroup),
            add_tenant => user.has_perm(Permission::AddTenant),
            change_tenant => user.has_perm(Permission::ChangeTenant),
            delete_tenant => user.has_perm(Permission::DeleteTenant),
        },
    }
}

pub fn render(name: &str, ctx: Value) -> Result<Html<String>, ViewError> {
    Ok(Html(templates::render(name, ctx)?))
}

pub fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response()
}

/// The posted slug, or one derived from the name when left blank.
pub fn slug_or_derived(slug: &str, name: &str) -> String {
    match slug.trim() {
        "" => models::validation::slugify(name),
        s => s.to_string(),
    }
}

/// A checkbox or submit button counts as set when it was posted at all.
pub fn is_set(value: &Option<String>) -> bool {
    value.is_some()
}

/// Paging parameters of a list view.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub export: Option<String>,
}

impl PageQuery {
    pub fn pagination(&self, cfg: &PaginationConfig) -> Pagination {
        Pagination::new(self.page, self.per_page, cfg.per_page)
    }
}

/// Multi-select form posted to the bulk delete views.
#[derive(Debug, Default, Deserialize)]
pub struct BulkDeleteForm {
    #[serde(default)]
    pub pk: Vec<Uuid>,
    #[serde(rename = "_confirm")]
    pub submitted: Option<String>,
    pub confirm: Option<String>,
}

pub const CONFIRM_REQUIRED: &str = "You must confirm the deletion.";
