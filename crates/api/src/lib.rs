//! HTTP checkout server with observability.
//!
//! Hosts checkout sessions behind REST endpoints, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod sessions;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{
    CartStore, CheckoutConfig, CheckoutError, HttpLedgerConfig, HttpOrderLedger, HttpPostalLookup,
    InMemoryCartStore, InMemoryOrderLedger, InMemoryPostalLookup, InMemoryProfileStore,
    OrderLedger, PostalLookup, PostalLookupConfig, ProfileStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::checkouts::{AppState, Coordinator};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::checkouts::begin))
        .route(
            "/checkout/{id}",
            get(routes::checkouts::get).delete(routes::checkouts::cancel),
        )
        .route("/checkout/{id}/proceed", post(routes::checkouts::proceed))
        .route(
            "/checkout/{id}/address",
            put(routes::checkouts::update_address),
        )
        .route(
            "/checkout/{id}/postal-lookup",
            post(routes::checkouts::postal_lookup),
        )
        .route("/checkout/{id}/confirm", post(routes::checkouts::confirm))
        .route("/checkout/{id}/retry", post(routes::checkouts::retry))
        .route("/checkout/{id}/reissue", post(routes::checkouts::reissue))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state.
///
/// Uses the HTTP ledger and postal lookup when configured and in-memory
/// stand-ins otherwise. Profiles and carts are always in memory.
pub fn create_default_state(
    config: CheckoutConfig,
    ledger: Option<HttpLedgerConfig>,
    postal: Option<PostalLookupConfig>,
) -> Result<Arc<AppState>, CheckoutError> {
    let ledger: Arc<dyn OrderLedger> = match ledger {
        Some(ledger) => Arc::new(HttpOrderLedger::new(&ledger)?),
        None => {
            tracing::warn!("LEDGER_URL not set, orders are kept in memory");
            Arc::new(InMemoryOrderLedger::new())
        }
    };
    let postal: Arc<dyn PostalLookup> = match postal {
        Some(postal) => Arc::new(HttpPostalLookup::new(&postal)?),
        None => Arc::new(InMemoryPostalLookup::new()),
    };
    let profiles: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
    let carts: Arc<dyn CartStore> = Arc::new(InMemoryCartStore::new());

    Ok(Arc::new(AppState::new(Coordinator::new(
        config, ledger, profiles, carts, postal,
    ))))
}
