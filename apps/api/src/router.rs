use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use serde_json::{json, Value};

use availability_cell::handlers::AvailabilityState;
use availability_cell::router::availability_routes;
use booking_cell::handlers::BookingState;
use booking_cell::router::appointment_routes;
use booking_cell::services::catalog::ServiceCatalog;
use shared_config::AppConfig;
use shared_store::RestDocumentStore;

pub fn create_router(
    config: Arc<AppConfig>,
    store: Arc<RestDocumentStore>,
    catalog: Arc<ServiceCatalog>,
) -> Router {
    let availability_state = AvailabilityState {
        config: config.clone(),
        store: store.clone(),
    };
    let booking_state = BookingState {
        config,
        store,
        catalog,
    };

    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .route("/health", get(health_check))
        .nest("/availability", availability_routes(availability_state))
        .nest("/appointments", appointment_routes(booking_state))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "scheduler-api"
    }))
}
