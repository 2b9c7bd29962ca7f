use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::errors::ViewError;
use crate::state::ServerState;

pub mod auth;
pub mod helpers;
pub mod tenant_groups;
pub mod tenants;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn not_found() -> ViewError {
    ViewError::NotFound("Page not found".into())
}

/// Build the full application router: auth pages plus the tenancy views.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let tenancy = Router::new()
        .route("/tenancy/tenant-groups/", get(tenant_groups::list))
        .route("/tenancy/tenant-groups/add/", get(tenant_groups::add_form).post(tenant_groups::add))
        .route("/tenancy/tenant-groups/delete/", post(tenant_groups::bulk_delete))
        .route("/tenancy/tenant-groups/:slug/edit/", get(tenant_groups::edit_form).post(tenant_groups::edit))
        .route("/tenancy/tenants/", get(tenants::list))
        .route("/tenancy/tenants/add/", get(tenants::add_form).post(tenants::add))
        .route("/tenancy/tenants/import/", get(tenants::import_form).post(tenants::import))
        .route("/tenancy/tenants/edit/", post(tenants::bulk_edit))
        .route("/tenancy/tenants/delete/", post(tenants::bulk_delete))
        .route("/tenancy/tenants/:slug/", get(tenants::detail))
        .route("/tenancy/tenants/:slug/edit/", get(tenants::edit_form).post(tenants::edit))
        .route("/tenancy/tenants/:slug/delete/", get(tenants::delete_form).post(tenants::delete));

    Router::new()
        .route("/", get(|| async { Redirect::to("/tenancy/tenants/") }))
        .route("/health", get(health))
        .route("/login/", get(auth::login_page).post(auth::login))
        .route("/logout/", post(auth::logout))
        .merge(tenancy)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), auth::identify_user))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
