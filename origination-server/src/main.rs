//! Credit Origination Server
//!
//! Hosts the application API and drives applications through their status
//! lifecycle from Kafka status change events.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use origination_core::clients::{FixedScoringClient, HttpSchemaRegistry, ScoringClient};
use origination_core::events::{
    AgreementCreatedHandler, EventCodec, InboundDispatcher, KafkaInboundConsumer, KafkaTransport,
    OutboundDispatcher, ScoringHandler,
};
use origination_core::framework::DatabaseProcessor;
use origination_core::idempotency::IdempotencyGuard;
use origination_core::pipeline::StatusUpdatePipeline;
use origination_core::repository::{ApplicationRepository, PgApplicationRepository};
use server::{build_router, run_server};
use shutdown::spawn_shutdown_broadcaster;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Credit Origination - application lifecycle service
#[derive(Parser, Debug)]
#[command(name = "origination-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./origination-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting origination-server v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let repository: Arc<dyn ApplicationRepository> = Arc::new(PgApplicationRepository::new(
        DatabaseProcessor::new(db_pool.clone()),
    ));

    // Outbound: resolve the schema id once, then publish through Kafka
    let codec = EventCodec::with_default_schema()?;
    let registry = HttpSchemaRegistry::new(config.schema_registry.url.clone());
    let transport = Arc::new(KafkaTransport::new(&config.kafka)?);
    let outbound = OutboundDispatcher::connect(
        &registry,
        transport,
        codec.clone(),
        config.kafka.topic.clone(),
    )
    .await
    .map_err(|e| {
        tracing::error!("Failed to set up event publishing: {}", e);
        e
    })?;

    let pipeline = Arc::new(StatusUpdatePipeline::new(
        repository.clone(),
        Arc::new(outbound),
    ));

    // Inbound: consume the same topic and drive applications forward
    let scoring: Arc<dyn ScoringClient> = Arc::new(FixedScoringClient::default());
    let inbound = Arc::new(
        InboundDispatcher::new(codec)
            .with_handler(Arc::new(AgreementCreatedHandler::new(pipeline.clone())))
            .with_handler(Arc::new(ScoringHandler::new(pipeline.clone(), scoring))),
    );
    let consumer = KafkaInboundConsumer::new(&config.kafka)?;

    let shutdown_rx = spawn_shutdown_broadcaster();
    let consumer_task = tokio::spawn(consumer.run(inbound, shutdown_rx.clone()));

    let state = AppState::new(
        repository,
        pipeline,
        config.admin,
        IdempotencyGuard::new(config.idempotency.capacity, config.idempotency.ttl),
    );
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", config.listen);
    let result = run_server(router, config.listen, shutdown_rx).await;

    tracing::info!("Waiting for event consumer to stop...");
    if let Err(e) = consumer_task.await {
        tracing::error!("Event consumer task failed: {}", e);
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,rdkafka=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
