// libs/availability-cell/src/router.rs

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_store::DocumentStore;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AvailabilityState};

pub fn availability_routes<S: DocumentStore + 'static>(state: AvailabilityState<S>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/{doctor_id}/{date}", get(handlers::get_availability::<S>))
        .route("/{doctor_id}", get(handlers::get_availability_range::<S>));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/{doctor_id}", put(handlers::set_availability::<S>))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
