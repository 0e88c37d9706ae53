use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workup_database::{create_pool, run_migrations};
use workup_marketplace::{build_app, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workup_marketplace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    let db_pool = create_pool(&config.database).await?;
    run_migrations(&db_pool).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_app(AppState::new(db_pool, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Work Up marketplace listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
