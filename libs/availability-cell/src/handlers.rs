// libs/availability-cell/src/handlers.rs

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

use crate::models::{AvailabilityResponse, SetAvailabilityRequest};
use crate::services::availability::AvailabilityService;

/// Shared state for the availability routes: the app config (auth
/// middleware) plus the document store the service runs against.
pub struct AvailabilityState<S> {
    pub config: Arc<AppConfig>,
    pub store: Arc<S>,
}

impl<S> Clone for AvailabilityState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

pub async fn get_availability<S: DocumentStore + 'static>(
    State(state): State<AvailabilityState<S>>,
    Path((doctor_id, date)): Path<(String, NaiveDate)>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let service = AvailabilityService::new(state.store.clone());
    let response = service.get_availability(&doctor_id, date).await?;
    Ok(Json(response))
}

pub async fn get_availability_range<S: DocumentStore + 'static>(
    State(state): State<AvailabilityState<S>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AvailabilityRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(state.store.clone());
    let days = service
        .get_availability_range(&doctor_id, query.from, query.to)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "days": days,
        "total": days.len()
    })))
}

// ==============================================================================
// PROTECTED HANDLERS (AUTHENTICATION REQUIRED)
// ==============================================================================

pub async fn set_availability<S: DocumentStore + 'static>(
    State(state): State<AvailabilityState<S>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<String>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    debug!(
        "User {} setting availability for doctor {} across {} dates",
        user.id,
        doctor_id,
        request.dates.len()
    );

    if request.dates.is_empty() {
        return Err(AppError::BadRequest("At least one date is required".to_string()));
    }

    let service = AvailabilityService::new(state.store.clone());
    let outcomes = service.set_availability(&doctor_id, &request).await?;

    let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
    let failed = outcomes.len() - succeeded;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "results": outcomes,
        "succeeded": succeeded,
        "failed": failed
    })))
}
