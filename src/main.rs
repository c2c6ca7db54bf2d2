use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use axum::extract::DefaultBodyLimit;
use clap::{Parser, ValueEnum};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use scoped_search::app::{self, AppState};
use scoped_search::auth::JwtKeys;
use scoped_search::config::config;
use scoped_search::database::{fixture, DatabaseManager, MemoryStore, PgStore, Store};
use scoped_search::schema::EntityRegistry;
use scoped_search::search::{SearchEngine, SearchSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Parser)]
#[command(name = "scoped-search")]
#[command(about = "Scoped search API - paginated, filtered, access-scoped record listing")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Port to listen on (overrides API_PORT)")]
    port: Option<u16>,

    #[arg(long, value_enum, default_value = "postgres", help = "Record store backend")]
    store: StoreKind,

    #[arg(long, help = "JSON or YAML fixture file to seed the memory store")]
    fixtures: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the config singleton reads the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config();
    tracing::info!("Starting scoped search in {:?} mode", config.environment);

    if scoped_search::is_production!() && config.security.jwt_secret.is_empty() {
        bail!("SECURITY_JWT_SECRET must be set in production");
    }

    let store = build_store(&cli).await?;
    tracing::info!(store = store.name(), "record store ready");

    let registry = EntityRegistry::builtin().context("invalid built-in entity schema")?;
    let engine = SearchEngine::new(store).with_settings(SearchSettings::from_config(config));
    let state = AppState::new(engine, registry, JwtKeys::new(&config.security.jwt_secret));

    let mut app = app::router(state).layer(
        ServiceBuilder::new()
            .layer(app::cors_layer(&config.security))
            .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes)),
    );
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    let port = cli.port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Scoped search listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn build_store(cli: &Cli) -> anyhow::Result<Arc<dyn Store>> {
    match cli.store {
        StoreKind::Memory => {
            let store = match &cli.fixtures {
                Some(path) => fixture::load_file(path).await?,
                None => MemoryStore::new(),
            };
            Ok(Arc::new(store))
        }
        StoreKind::Postgres => {
            if cli.fixtures.is_some() {
                tracing::warn!("--fixtures is ignored for the postgres store");
            }
            let pool = DatabaseManager::connect(&config().database).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}
