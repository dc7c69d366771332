use anyhow::Context as _;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing::info;

use bboard::config::BoardConfig;
use bboard::router::build_router;
use bboard::state::AppState;
use bboard_core::config::Config;
use bboard_core::tracing::init_tracing;
use bboard_migration::Migrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = BoardConfig::try_from_env().context("load board config")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;
    Migrator::up(&db, None).await.context("run migrations")?;

    let addr = format!("0.0.0.0:{}", config.board_port);
    let state = AppState::new(db, config).context("build activation signer")?;
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("board service listening on {addr}");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
