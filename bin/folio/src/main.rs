//! Folio - paginated GraphQL access to document collections.
//!
//! # Usage
//!
//! ```bash
//! # Serve collections stored in PostgreSQL
//! DATABASE_URL=postgres://localhost/folio folio
//!
//! # Serve an in-memory data set
//! folio --memory --seed-file fixtures.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use folio_core::config::{DEFAULT_ID_FIELD, DEFAULT_LIMIT, DEFAULT_MAX_LIMIT, PaginationConfig};
use folio_core::metrics::init_metrics;
use folio_core::ports::Collections;
use folio_graphql::{ServerConfig, build_schema, serve_with_shutdown};
use folio_storage::{Database, DatabaseConfig, MemoryCollections, PgCollections};

/// Folio CLI.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Folio - keyset and offset pagination over document collections")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/folio")]
    database_url: String,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Page size when a query omits `first`/`last`/`limit`.
    #[arg(long, env = "DEFAULT_LIMIT", default_value_t = DEFAULT_LIMIT)]
    default_limit: usize,

    /// Largest page size a query may request.
    #[arg(long, env = "MAX_LIMIT", default_value_t = DEFAULT_MAX_LIMIT)]
    max_limit: usize,

    /// Document identifier field.
    #[arg(long, env = "ID_FIELD", default_value = DEFAULT_ID_FIELD)]
    id_field: String,

    /// Serve in-memory collections instead of PostgreSQL.
    #[arg(long)]
    memory: bool,

    /// JSON file mapping collection names to document arrays.
    ///
    /// With `--memory` the collections are served from memory; otherwise
    /// the documents are upserted into PostgreSQL before serving.
    #[arg(long, env = "SEED_FILE")]
    seed_file: Option<PathBuf>,

    /// Run database migrations and exit.
    #[arg(long, conflicts_with = "memory")]
    migrate_only: bool,
}

impl Cli {
    fn pagination_config(&self) -> Result<PaginationConfig> {
        let config = PaginationConfig {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            id_field: self.id_field.clone(),
            ..Default::default()
        };
        config.validate().context("Invalid pagination settings")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => match PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
        {
            Ok(()) => {
                init_metrics();
                true
            }
            Err(e) => {
                warn!("Failed to start metrics exporter: {}. Continuing without metrics.", e);
                false
            }
        },
        Err(e) => {
            warn!("Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("Starting Folio");
    let pagination = cli.pagination_config()?;
    debug!(
        default_limit = pagination.default_limit,
        max_limit = pagination.max_limit,
        id_field = %pagination.id_field,
        "Pagination settings"
    );

    if cli.migrate_only {
        return run_migrations(&cli.database_url).await;
    }

    let seed = match &cli.seed_file {
        Some(path) => Some(read_seed(path)?),
        None => None,
    };

    // ─────────────────────────────────────────────────────────────────────────
    // STORAGE
    // ─────────────────────────────────────────────────────────────────────────
    let mut db = None;
    let collections: Arc<dyn Collections> = if cli.memory {
        let collections = match &seed {
            Some(seed) => MemoryCollections::from_seed(seed).context("Invalid seed file")?,
            None => MemoryCollections::new(),
        };
        info!(collections = ?collections.names().await, "In-memory store ready");
        Arc::new(collections)
    } else {
        debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");
        info!("Connecting to database...");
        let database = Database::connect(&DatabaseConfig::for_server(&cli.database_url))
            .await
            .context("Failed to connect to database")?;

        database.migrate().await.context("Failed to run migrations")?;
        info!("Database ready (migrations applied)");

        let database = Arc::new(database);
        let collections = PgCollections::with_id_field(database.clone(), pagination.id_field.clone());
        if let Some(seed) = &seed {
            load_seed(&collections, seed).await?;
        }
        info!(
            collections = ?database.collection_names().await.unwrap_or_default(),
            "PostgreSQL store ready"
        );

        db = Some(database);
        Arc::new(collections)
    };

    // ─────────────────────────────────────────────────────────────────────────
    // SERVER
    // ─────────────────────────────────────────────────────────────────────────
    let schema = build_schema(collections, pagination);
    let graphql_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: cli.graphql_port,
        enable_playground: true,
    };

    info!("Folio ready");
    info!("   GraphQL:  http://localhost:{}/graphql", cli.graphql_port);
    if metrics_enabled {
        info!("   Metrics:  http://localhost:{}/metrics", cli.metrics_port);
    } else {
        info!("   Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    if let Err(e) = serve_with_shutdown(schema, graphql_config, shutdown_signal()).await {
        error!(error = %e, "Server error");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("Shutting down...");
    if let Some(db) = db {
        match tokio::time::timeout(Duration::from_secs(10), db.close()).await {
            Ok(()) => debug!("Database pool closed"),
            Err(_) => warn!("Database shutdown timed out"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Apply migrations on a small one-shot pool, then exit.
async fn run_migrations(database_url: &str) -> Result<()> {
    debug!(database_url = %mask_password(database_url), "Database endpoint");
    let database = Database::connect(&DatabaseConfig::for_tasks(database_url))
        .await
        .context("Failed to connect to database")?;

    database.migrate().await.context("Failed to run migrations")?;
    database.close().await;

    info!("Migrations applied, exiting (--migrate-only)");
    Ok(())
}

/// Read a seed file: `{"collection": [doc, ...], ...}`.
fn read_seed(path: &PathBuf) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Seed file {} is not JSON", path.display()))
}

/// Upsert seed documents into PostgreSQL collections.
async fn load_seed(collections: &PgCollections, seed: &serde_json::Value) -> Result<()> {
    // Reuse the in-memory parser for shape validation.
    let parsed = MemoryCollections::from_seed(seed).context("Invalid seed file")?;

    for name in parsed.names().await {
        let Some(store) = parsed.store(&name).await else {
            continue;
        };
        let docs = store.documents().await;
        let written = collections
            .store(&name)
            .upsert_many(&docs)
            .await
            .with_context(|| format!("Failed to seed collection {name}"))?;
        info!(collection = %name, written, "Seeded collection");
    }

    Ok(())
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
