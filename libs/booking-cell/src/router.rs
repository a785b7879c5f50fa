// libs/booking-cell/src/router.rs

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_store::DocumentStore;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, BookingState};

pub fn appointment_routes<S: DocumentStore + 'static>(state: BookingState<S>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment::<S>))
        .route("/{appointment_id}", get(handlers::get_appointment::<S>))
        .route("/{appointment_id}/cancel", put(handlers::cancel_appointment::<S>))
        .route("/{appointment_id}/confirm", put(handlers::confirm_appointment::<S>))
        .route("/{appointment_id}/reschedule", put(handlers::reschedule_appointment::<S>))

        // Appointment listings
        .route("/patient/{patient_id}", get(handlers::get_patient_appointments::<S>))
        .route("/doctor/{doctor_id}", get(handlers::get_doctor_appointments::<S>))

        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
