//! API server entry point.

use std::time::Duration;

use api::config::Config;
use checkout::{CheckoutConfig, HttpLedgerConfig, PostalLookupConfig};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    // 2. Load checkout configuration; refuse to start on bad values
    let env = |key: &str| std::env::var(key).ok();
    let checkout_config = match CheckoutConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid checkout configuration");
            std::process::exit(1);
        }
    };
    let ledger_config = match HttpLedgerConfig::from_lookup(env) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid ledger configuration");
            std::process::exit(1);
        }
    };
    let postal_config = PostalLookupConfig::from_lookup(env);

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Build the application
    let state = match api::create_default_state(checkout_config, ledger_config, postal_config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to build collaborators");
            std::process::exit(1);
        }
    };
    let sweeper = tokio::spawn(api::sessions::sweep_idle(
        state.clone(),
        config.session_idle,
        SWEEP_INTERVAL,
    ));
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting checkout server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    sweeper.abort();
    tracing::info!("server shut down gracefully");
}
