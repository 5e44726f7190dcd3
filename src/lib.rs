pub mod db;
pub mod model;
pub mod notify;
pub mod services;
pub mod utils;

pub use services::{PasswordResetService, ResetSettings};
pub use utils::errors::{ErrorCode, RecoveryError, ResetError};

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use dotenv::dotenv;
use mongodb::Client;
use tokio::sync::oneshot;
use db::{mongo, token::MongoTokenStore, user::MongoCredentialStore};
use model::algorithm::PasswordAlgorithm;
use notify::NotificationGateway;
use utils::{config::{self, Configuration}, token_codec::TokenCodec, urls::AppUrls};
use opentelemetry::{global, sdk::{propagation::TraceContextPropagator, trace, trace::Sampler}};
use tracing_subscriber::{prelude::__tracing_subscriber_SubscriberExt, Registry, util::SubscriberInitExt};

pub const APP_NAME: &str = "Recovery";

///
/// Entry point of the sweeper daemon.
///
pub async fn lib_main() -> Result<(), RecoveryError> {

    // Load any local dev settings as environment variables from a .env file.
    dotenv().ok();

    // Default log level to INFO if it's not specified.
    config::default_env("RUST_LOG", "INFO");

    // SIGINT/ctrl+c handling for graceful shutdown.
    let (signal_tx, signal_rx) = oneshot::channel();
    let _signal = tokio::spawn(wait_for_signal(signal_tx));

    let config = Configuration::from_env()?;

    // Initialise open-telemetry distributed tracing.
    let tracing = init_tracing(&config);

    tracing::info!("{}\n{}", BANNER, config.fmt_console()?);

    // Create a MongoDB client and connect to it before proceeding.
    let client = mongo::get_mongo_client(APP_NAME, &config).await?;

    // Ensure the indexes are in sync with the code.
    mongo::update_mongo(&client.database(&config.db_name)).await?;

    if config.transactions_without_replica_set() {
        tracing::warn!("mongo_transactions is on but mongo_uri names no replicaSet - token replacement will fail on a standalone server");
    }

    let service = Arc::new(build_service(&config, client)?);

    services::run_sweeper(
        service,
        Duration::from_secs(config.purge_interval_seconds),
        signal_rx).await;

    if tracing {
        opentelemetry::global::shutdown_tracer_provider(); // sending remaining spans
    }

    Ok(())
}

///
/// Wire a reset service to MongoDB and the configured mail gateway.
///
pub fn build_service(config: &Configuration, client: Client) -> Result<PasswordResetService, RecoveryError> {
    let db = client.database(&config.db_name);

    Ok(PasswordResetService::new(
        TokenCodec,
        Arc::new(MongoTokenStore::new(client, &config.db_name, config.mongo_transactions)),
        Arc::new(MongoCredentialStore::new(db)),
        notifier(config)?,
        Arc::new(AppUrls::new(&config.reset_url_base, &config.reset_path)?),
        PasswordAlgorithm::from_config(config)?,
        ResetSettings::from(config)))
}

#[cfg(feature = "kafka")]
fn notifier(config: &Configuration) -> Result<Arc<dyn NotificationGateway>, RecoveryError> {
    Ok(Arc::new(notify::kafka::KafkaGateway::new(config)?))
}

#[cfg(not(feature = "kafka"))]
fn notifier(_config: &Configuration) -> Result<Arc<dyn NotificationGateway>, RecoveryError> {
    tracing::warn!("Built without the kafka feature - reset emails are logged, not sent");
    Ok(Arc::new(notify::TracingGateway))
}

///
/// Sends a oneshot signal when a SIGINT is received (Ctrl+C)
///
async fn wait_for_signal(tx: oneshot::Sender<()>) {
    let _ = signal::ctrl_c().await;
    tracing::info!("SIGINT received: shutting down");
    let _ = tx.send(());
}

///
/// Initialise tracing and plug-in the Jaeger feature if enabled.
///
pub fn init_tracing(config: &Configuration) -> bool {
    global::set_text_map_propagator(TraceContextPropagator::new());

    if config.distributed_tracing {
        let tracer = opentelemetry_jaeger::new_pipeline()
            .with_service_name(APP_NAME)
            .with_trace_config(trace::config().with_sampler(Sampler::AlwaysOn))
            .with_agent_endpoint(config.jaeger_endpoint.clone().unwrap_or_default())
            .install_batch(opentelemetry::runtime::Tokio);

        match tracer {
            Ok(tracer) => {
                if let Err(err) = Registry::default()
                    .with(tracing_subscriber::EnvFilter::from_default_env()) // Set the tracing level to match RUST_LOG env variable.
                    .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
                    .with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .try_init() {
                        tracing::info!("Tracing already initialised: {}", err.to_string()); // Allowed error here - tests call this fn repeatedly.
                }
                return true
            },
            Err(err) => eprintln!("Unable to build Jaeger pipeline, continuing without it: {}", err),
        }
    }

    if let Err(err) = Registry::default()
        .with(tracing_subscriber::EnvFilter::from_default_env()) // Set the tracing level to match RUST_LOG env variable.
        .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
        .try_init() {
            tracing::info!("Tracing already initialised: {}", err.to_string()); // Allowed error here - tests call this fn repeatedly.
    }

    false
}

const BANNER: &str = r#"
__________
\______   \ ____   ____  _______  __ ___________ ___.__.
 |       _// __ \_/ ___\/  _ \  \/ // __ \_  __ <   |  |
 |    |   \  ___/\  \__(  <_> )   /\  ___/|  | \/\___  |
 |____|_  /\___  >\___  >____/ \_/  \___  >__|   / ____|
        \/     \/     \/                \/       \/
"#;
