// libs/booking-cell/src/handlers.rs

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_store::DocumentStore;

use crate::models::{
    BookAppointmentRequest, CancelAppointmentRequest, RescheduleAppointmentRequest,
};
use crate::services::booking::BookingService;
use crate::services::catalog::ServiceCatalog;

/// Shared state for the appointment routes: config for the auth middleware,
/// the document store, and the catalog the engine resolves durations from.
pub struct BookingState<S> {
    pub config: Arc<AppConfig>,
    pub store: Arc<S>,
    pub catalog: Arc<ServiceCatalog>,
}

impl<S> Clone for BookingState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<S: DocumentStore> BookingState<S> {
    fn service(&self) -> BookingService<S> {
        BookingService::with_catalog(self.store.clone(), self.catalog.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct DoctorAppointmentsQuery {
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// APPOINTMENT BOOKING HANDLERS (ALL AUTHENTICATED)
// ==============================================================================

pub async fn book_appointment<S: DocumentStore + 'static>(
    State(state): State<BookingState<S>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    debug!(
        "User {} booking appointment for patient {} with doctor {}",
        user.id, request.patient_id, request.doctor_id
    );

    let appointment = state.service().book(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

pub async fn get_appointment<S: DocumentStore + 'static>(
    State(state): State<BookingState<S>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.service().get_appointment(&appointment_id).await?;
    Ok(Json(json!(appointment)))
}

pub async fn get_patient_appointments<S: DocumentStore + 'static>(
    State(state): State<BookingState<S>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.service().get_patient_appointments(&patient_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_doctor_appointments<S: DocumentStore + 'static>(
    State(state): State<BookingState<S>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<DoctorAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state
        .service()
        .get_doctor_appointments(&doctor_id, query.date)
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn cancel_appointment<S: DocumentStore + 'static>(
    State(state): State<BookingState<S>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} cancelling appointment {}", user.id, appointment_id);

    let reason = request.and_then(|Json(body)| body.reason);
    let appointment = state
        .service()
        .cancel(&appointment_id, reason.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

pub async fn confirm_appointment<S: DocumentStore + 'static>(
    State(state): State<BookingState<S>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} confirming appointment {}", user.id, appointment_id);

    let appointment = state.service().confirm(&appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment confirmed successfully"
    })))
}

pub async fn reschedule_appointment<S: DocumentStore + 'static>(
    State(state): State<BookingState<S>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} rescheduling appointment {}", user.id, appointment_id);

    let appointment = state
        .service()
        .reschedule(&appointment_id, request.new_date, request.new_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}
