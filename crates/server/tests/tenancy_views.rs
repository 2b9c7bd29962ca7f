use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use configs::AppConfig;
use models::tenant::TenantFields;
use server::routes;
use server::state::ServerState;
use service::auth::domain::{LoginInput, NewUserInput};
use service::tenant_service;

struct TestApp {
    state: ServerState,
}

impl TestApp {
    async fn new() -> Self {
        let db = models::db::connect_with_config(&models::db::in_memory_config()).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let mut cfg = AppConfig::default();
        cfg.auth.jwt_secret = "test-secret".into();
        Self { state: ServerState::new(db, &cfg) }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    fn router(&self) -> Router {
        routes::build_router(self.state.clone(), CorsLayer::very_permissive())
    }

    /// Create a user and return a bearer token for it.
    async fn token_for(&self, username: &str, is_superuser: bool, permissions: &[&str]) -> String {
        let svc = self.state.auth_service();
        svc.create_user(NewUserInput {
            username: username.into(),
            password: "Secret123".into(),
            is_superuser,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        })
        .await
        .unwrap();
        svc.login(LoginInput { username: username.into(), password: "Secret123".into() }).await.unwrap().token
    }

    async fn tenant(&self, name: &str, slug: &str) -> models::tenant::Model {
        let fields = TenantFields {
            name: name.into(),
            slug: slug.into(),
            group_id: None,
            description: String::new(),
            comments: String::new(),
        };
        tenant_service::create_tenant(self.db(), &fields).await.unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, header::HeaderMap, String) {
        let res = self.router().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, token: Option<&str>, form: &[(&str, &str)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(form).unwrap();
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    builder.body(Body::from(body)).unwrap()
}

fn location(headers: &header::HeaderMap) -> &str {
    headers.get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

#[tokio::test]
async fn detail_page_shows_every_count() {
    let app = TestApp::new().await;
    let acme = app.tenant("Acme", "acme").await;
    models::site::create(app.db(), "HQ", "hq", Some(acme.id)).await.unwrap();

    let (status, _, body) = app.send(get("/tenancy/tenants/acme/", None)).await;
    assert_eq!(status, StatusCode::OK);
    for id in [
        "site_count", "rack_count", "device_count", "vrf_count",
        "prefix_count", "ipaddress_count", "vlan_count", "circuit_count",
    ] {
        assert!(body.contains(&format!("id=\"{}\"", id)), "missing {}", id);
    }
    assert!(body.contains(r#"id="site_count">1<"#));
    assert!(body.contains(r#"id="rack_count">0<"#));
}

#[tokio::test]
async fn unknown_tenant_is_404() {
    let app = TestApp::new().await;
    let (status, _, _) = app.send(get("/tenancy/tenants/nope/", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = app.send(get("/no/such/page", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn prefixes_and_addresses_inherit_through_vrf() {
    let app = TestApp::new().await;
    let acme = app.tenant("Acme", "acme").await;
    let other = app.tenant("Other", "other").await;
    let vrf = models::vrf::create(app.db(), "Blue", "65000:1", Some(acme.id)).await.unwrap();

    // direct, inherited, direct inside own vrf (counted once), owned by someone else
    models::prefix::create(app.db(), "10.0.0.0/24", None, Some(acme.id)).await.unwrap();
    models::prefix::create(app.db(), "10.1.0.0/24", Some(vrf.id), None).await.unwrap();
    models::prefix::create(app.db(), "10.2.0.0/24", Some(vrf.id), Some(acme.id)).await.unwrap();
    models::prefix::create(app.db(), "10.3.0.0/24", Some(vrf.id), Some(other.id)).await.unwrap();
    models::ip_address::create(app.db(), "10.1.0.1/24", Some(vrf.id), None).await.unwrap();

    let (status, _, body) = app.send(get("/tenancy/tenants/acme/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"id="vrf_count">1<"#));
    assert!(body.contains(r#"id="prefix_count">3<"#));
    assert!(body.contains(r#"id="ipaddress_count">1<"#));
}

#[tokio::test]
async fn anonymous_writes_need_login() {
    let app = TestApp::new().await;
    app.tenant("Acme", "acme").await;

    let (status, _, body) = app.send(get("/tenancy/tenants/acme/edit/", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("/login/"));
    let (status, _, _) = app.send(post("/tenancy/tenants/acme/delete/", None, &[("confirm", "on")])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_permission_is_denied() {
    let app = TestApp::new().await;
    let acme = app.tenant("Acme", "acme").await;
    service::tenant_group_service::create_group(
        app.db(),
        &models::tenant_group::GroupFields { name: "Customers".into(), slug: "customers".into() },
    )
    .await
    .unwrap();
    let pk = acme.id.to_string();
    let token = app.token_for("viewer", false, &[]).await;
    let t = Some(token.as_str());

    let requests = vec![
        get("/tenancy/tenants/add/", t),
        post("/tenancy/tenants/add/", t, &[("name", "Globex"), ("slug", "globex")]),
        get("/tenancy/tenants/acme/edit/", t),
        post("/tenancy/tenants/acme/edit/", t, &[("name", "Acme"), ("slug", "acme")]),
        get("/tenancy/tenants/acme/delete/", t),
        post("/tenancy/tenants/acme/delete/", t, &[("confirm", "on")]),
        get("/tenancy/tenants/import/", t),
        post("/tenancy/tenants/import/", t, &[("csv", "Globex,globex\n")]),
        post("/tenancy/tenants/edit/", t, &[("pk", pk.as_str()), ("_apply", "1"), ("group", "none")]),
        post("/tenancy/tenants/delete/", t, &[("pk", pk.as_str()), ("_confirm", "1"), ("confirm", "on")]),
        get("/tenancy/tenant-groups/add/", t),
        get("/tenancy/tenant-groups/customers/edit/", t),
        post("/tenancy/tenant-groups/customers/edit/", t, &[("name", "Renamed"), ("slug", "renamed")]),
        post("/tenancy/tenant-groups/delete/", t, &[("pk", pk.as_str())]),
    ];
    for req in requests {
        let uri = format!("{} {}", req.method(), req.uri());
        let (status, _, _) = app.send(req).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }
    // nothing changed
    assert!(tenant_service::get_tenant_by_slug(app.db(), "acme").await.is_ok());
    assert!(tenant_service::get_tenant_by_slug(app.db(), "globex").await.is_err());
    assert!(service::tenant_group_service::get_group_by_slug(app.db(), "customers").await.is_ok());

    // a single permission opens exactly its view
    let importer = app.token_for("importer", false, &["tenancy.add_tenant"]).await;
    let (status, _, _) = app.send(get("/tenancy/tenants/import/", Some(&importer))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = app.send(get("/tenancy/tenants/acme/edit/", Some(&importer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bulk_edit_sets_and_clears_group() {
    let app = TestApp::new().await;
    let group = service::tenant_group_service::create_group(
        app.db(),
        &models::tenant_group::GroupFields { name: "Customers".into(), slug: "customers".into() },
    )
    .await
    .unwrap();
    let acme = app.tenant("Acme", "acme").await.id.to_string();
    let globex = app.tenant("Globex", "globex").await.id.to_string();
    let gid = group.id.to_string();
    let token = app.token_for("editor", false, &["tenancy.change_tenant"]).await;
    let t = Some(token.as_str());

    let (status, _, body) = app.send(post("/tenancy/tenants/edit/", t, &[("pk", acme.as_str()), ("pk", globex.as_str())])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Editing 2 tenants"));

    let form = [("pk", acme.as_str()), ("pk", globex.as_str()), ("_apply", "1"), ("group", gid.as_str())];
    let (status, headers, _) = app.send(post("/tenancy/tenants/edit/", t, &form)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/tenancy/tenants/");
    for slug in ["acme", "globex"] {
        assert_eq!(tenant_service::get_tenant_by_slug(app.db(), slug).await.unwrap().group_id, Some(group.id));
    }

    // empty leaves the group alone
    let form = [("pk", acme.as_str()), ("_apply", "1"), ("group", "")];
    let (status, _, _) = app.send(post("/tenancy/tenants/edit/", t, &form)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(tenant_service::get_tenant_by_slug(app.db(), "acme").await.unwrap().group_id, Some(group.id));

    let form = [("pk", acme.as_str()), ("_apply", "1"), ("group", "none")];
    let (status, _, _) = app.send(post("/tenancy/tenants/edit/", t, &form)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(tenant_service::get_tenant_by_slug(app.db(), "acme").await.unwrap().group_id, None);
    assert_eq!(tenant_service::get_tenant_by_slug(app.db(), "globex").await.unwrap().group_id, Some(group.id));
}

#[tokio::test]
async fn list_filters_from_query_string() {
    let app = TestApp::new().await;
    let token = app.token_for("admin", true, &[]).await;
    let t = Some(token.as_str());
    app.send(post("/tenancy/tenant-groups/add/", t, &[("name", "Customers"), ("slug", "customers")])).await;
    let group = service::tenant_group_service::get_group_by_slug(app.db(), "customers").await.unwrap();
    let gid = group.id.to_string();
    app.send(post("/tenancy/tenants/add/", t, &[("name", "Acme"), ("slug", "acme"), ("group", gid.as_str())])).await;
    app.send(post("/tenancy/tenants/add/", t, &[("name", "Globex"), ("slug", "globex"), ("description", "Widgets")])).await;

    let (status, _, body) = app.send(get("/tenancy/tenants/?group=customers", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/tenancy/tenants/acme/"));
    assert!(!body.contains("/tenancy/tenants/globex/"));

    let (_, _, body) = app.send(get(&format!("/tenancy/tenants/?group_id={}", gid), None)).await;
    assert!(body.contains("/tenancy/tenants/acme/"));
    assert!(!body.contains("/tenancy/tenants/globex/"));

    let (_, _, body) = app.send(get("/tenancy/tenants/?q=WIDG", None)).await;
    assert!(body.contains("/tenancy/tenants/globex/"));
    assert!(!body.contains("/tenancy/tenants/acme/"));

    let (_, _, body) = app.send(get("/tenancy/tenants/?q=_", None)).await;
    assert!(!body.contains("/tenancy/tenants/acme/"));
    assert!(!body.contains("/tenancy/tenants/globex/"));

    let (status, headers, body) = app.send(get("/tenancy/tenants/?q=acme&export", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert!(body.contains("Acme,acme,Customers,"));
    assert!(!body.contains("Globex"));
}

#[tokio::test]
async fn blank_slug_is_derived_from_name() {
    let app = TestApp::new().await;
    let token = app.token_for("admin", true, &[]).await;
    let (status, _, _) = app
        .send(post("/tenancy/tenant-groups/add/", Some(&token), &[("name", "Managed Customers"), ("slug", "")]))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(service::tenant_group_service::get_group_by_slug(app.db(), "managed-customers").await.is_ok());
}

#[tokio::test]
async fn deleted_tenant_leaves_the_list() {
    let app = TestApp::new().await;
    app.tenant("Acme", "acme").await;
    app.tenant("Globex", "globex").await;
    let token = app.token_for("admin", true, &[]).await;

    let (_, _, body) = app.send(get("/tenancy/tenants/", None)).await;
    assert!(body.contains("/tenancy/tenants/acme/"));

    let (status, _, body) = app.send(post("/tenancy/tenants/acme/delete/", Some(&token), &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("You must confirm the deletion."));

    let (status, headers, _) = app.send(post("/tenancy/tenants/acme/delete/", Some(&token), &[("confirm", "on")])).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/tenancy/tenants/");

    let (status, _, body) = app.send(get("/tenancy/tenants/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("/tenancy/tenants/acme/"));
    assert!(body.contains("/tenancy/tenants/globex/"));
}

#[tokio::test]
async fn tenant_with_objects_is_protected() {
    let app = TestApp::new().await;
    let acme = app.tenant("Acme", "acme").await;
    models::site::create(app.db(), "HQ", "hq", Some(acme.id)).await.unwrap();
    let token = app.token_for("admin", true, &[]).await;

    let (status, _, body) = app.send(post("/tenancy/tenants/acme/delete/", Some(&token), &[("confirm", "on")])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("sites"));
    assert!(tenant_service::get_tenant_by_slug(app.db(), "acme").await.is_ok());
}

#[tokio::test]
async fn import_creates_every_row() {
    let app = TestApp::new().await;
    let token = app.token_for("importer", false, &["tenancy.add_tenant"]).await;
    let csv = "Acme,acme\nGlobex,globex,,Widgets\nInitech,initech\n";

    let (status, headers, _) = app.send(post("/tenancy/tenants/import/", Some(&token), &[("csv", csv)])).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/tenancy/tenants/");

    let rows = tenant_service::all_tenants(app.db(), &Default::default()).await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn bad_import_writes_nothing() {
    let app = TestApp::new().await;
    let token = app.token_for("importer", false, &["tenancy.add_tenant"]).await;
    let csv = "Acme,acme\nBroken,not a slug\n";

    let (status, _, body) = app.send(post("/tenancy/tenants/import/", Some(&token), &[("csv", csv)])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Line 2"));
    let rows = tenant_service::all_tenants(app.db(), &Default::default()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn add_form_errors_rerender() {
    let app = TestApp::new().await;
    let token = app.token_for("editor", false, &["tenancy.change_tenant"]).await;

    let (status, _, _) = app.send(post("/tenancy/tenants/add/", Some(&token), &[("name", ""), ("slug", "x")])).await;
    assert_eq!(status, StatusCode::OK);

    let group = Uuid::new_v4().to_string();
    let (status, _, _) = app
        .send(post("/tenancy/tenants/add/", Some(&token), &[("name", "Acme"), ("slug", "acme"), ("group", group.as_str())]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(tenant_service::get_tenant_by_slug(app.db(), "acme").await.is_err());

    let (status, headers, _) = app
        .send(post("/tenancy/tenants/add/", Some(&token), &[("name", "Acme"), ("slug", "acme"), ("_addanother", "1")]))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/tenancy/tenants/add/");
}

#[tokio::test]
async fn group_lifecycle() {
    let app = TestApp::new().await;
    let token = app.token_for("admin", true, &[]).await;
    let t = Some(token.as_str());

    let (status, _, _) = app.send(post("/tenancy/tenant-groups/add/", t, &[("name", "Customers"), ("slug", "customers")])).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let group = service::tenant_group_service::get_group_by_slug(app.db(), "customers").await.unwrap();
    let gid = group.id.to_string();

    let (status, _, _) = app
        .send(post("/tenancy/tenants/add/", t, &[("name", "Acme"), ("slug", "acme"), ("group", gid.as_str())]))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (status, _, body) = app.send(get("/tenancy/tenant-groups/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Customers"));

    let (status, headers, body) = app.send(get("/tenancy/tenant-groups/?export", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert!(body.contains("Customers,customers"));

    let (status, headers, _) = app
        .send(post("/tenancy/tenant-groups/delete/", t, &[("pk", gid.as_str()), ("_confirm", "1"), ("confirm", "on")]))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/tenancy/tenant-groups/");

    let acme = tenant_service::get_tenant_by_slug(app.db(), "acme").await.unwrap();
    assert_eq!(acme.group_id, None);
}

#[tokio::test]
async fn login_sets_cookie_and_invalid_token_is_rejected() {
    let app = TestApp::new().await;
    app.token_for("editor", false, &["tenancy.change_tenant"]).await;

    let (status, headers, _) = app
        .send(post("/login/", None, &[("username", "editor"), ("password", "Secret123"), ("next", "/tenancy/tenants/add/")]))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/tenancy/tenants/add/");
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("auth_token="));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let req = Request::builder()
        .uri("/tenancy/tenants/add/")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send(post("/login/", None, &[("username", "editor"), ("password", "wrong-pass")])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Please enter a correct username and password."));

    let (status, _, _) = app.send(get("/tenancy/tenants/", Some("not.a.token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = app.send(get("/login/", Some("not.a.token"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, _, body) = app.send(get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
}
