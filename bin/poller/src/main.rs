//! Poller daemon: wires the Postgres store and lease, the workflow engine
//! client, and the scheduling engine into one timer-driven process.
//!
//! Every replica runs this same binary; the lease decides which one
//! actually executes a given cycle.

use chime_conductor::ConductorClient;
use chime_engine::ScheduleExecutor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ulid::Ulid;

mod config;
mod db;

use config::PollerConfig;
use db::{PostgresLeaseManager, PostgresScheduleStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = PollerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let conductor =
        ConductorClient::new(&config.conductor).expect("failed to build workflow engine client");

    // Distinct per process so lease ownership survives restarts correctly:
    // a restarted replica is a new holder, never a stale one.
    let holder_id = format!("poller-{}-{}", std::process::id(), Ulid::new());
    tracing::info!(holder_id = %holder_id, "starting poll loop");

    let executor = ScheduleExecutor::new(
        PostgresScheduleStore::new(db_pool.clone()),
        PostgresLeaseManager::new(db_pool.clone()),
        conductor.clone(),
        conductor,
        config.engine.clone(),
        holder_id,
    );

    let mut interval = tokio::time::interval(config.engine.poll_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // The executor logs per-cycle reports; only cycle-aborting
                // failures surface here.
                if let Err(e) = executor.run_cycle().await {
                    tracing::error!(error = %e, "poll cycle aborted");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }
}
