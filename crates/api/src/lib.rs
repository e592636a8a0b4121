//! HTTP front end for the order fulfillment saga.
//!
//! Accepts orders, starts one saga per order, serves status queries and
//! relays cancellation requests. Requests are traced and saga metrics are
//! exported in Prometheus format.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{ActivityRegistry, RetryPolicy, SagaRuntime};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + 'static>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/api/orders/create", post(routes::orders::create::<S>))
        .route("/api/orders/{id}", get(routes::orders::get::<S>))
        .route("/api/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/api/sagas/{saga_id}/status", get(routes::sagas::status::<S>))
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

/// Creates application state backed by simulated activities.
pub fn create_default_state<S: EventStore + 'static>(event_store: S, config: &Config) -> Arc<AppState<S>> {
    let activities = ActivityRegistry::simulated(&config.activities);
    create_state(event_store, activities, config.retry_policy())
}

/// Creates application state with explicit activities and retry policy.
pub fn create_state<S: EventStore + 'static>(
    event_store: S,
    activities: ActivityRegistry,
    retry_policy: RetryPolicy,
) -> Arc<AppState<S>> {
    tracing::info!(activities = ?activities.names(), "activities registered");
    Arc::new(AppState {
        runtime: SagaRuntime::new(event_store, activities, retry_policy),
    })
}
