use std::net::SocketAddr;

use axum::Router;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::info;

use common::utils::logging::init_logging_default;
use configs::AppConfig;

use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Connect, migrate, and create the bootstrap admin if one is configured.
pub async fn prepare_state(cfg: &AppConfig) -> anyhow::Result<ServerState> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;
    info!("migrations applied");

    let state = ServerState::new(db, cfg);
    if let Some(admin) = &cfg.auth.bootstrap_admin {
        let created = state
            .auth_service()
            .ensure_bootstrap_admin(&admin.username, &admin.password)
            .await
            .map_err(|e| anyhow::anyhow!("bootstrap admin: {}", e))?;
        if created {
            info!(username = %admin.username, "bootstrap admin created");
        }
    }
    Ok(state)
}

/// Build the app from configuration and serve until `shutdown` resolves.
pub async fn serve(cfg: AppConfig, shutdown: impl std::future::Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
    let state = prepare_state(&cfg).await?;
    let app: Router = routes::build_router(state, build_cors());

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting tenancy server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server stopped");
    Ok(())
}

/// Public entry: load `.env` and configuration, then run until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_default();
    let cfg = AppConfig::load_and_validate()?;
    serve(cfg, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
