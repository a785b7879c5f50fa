// libs/booking-cell/src/models.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use availability_cell::models::AvailabilityError;
use shared_models::error::AppError;
use shared_store::{DocumentKey, StoreError};

pub const APPOINTMENTS_COLLECTION: &str = "appointments";

// ==============================================================================
// SERVICE-TYPE CATALOG
// ==============================================================================

/// Closed set of bookable services. Duration and price are never stored on
/// this enum; they come from the catalog entry at the moment they are needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum ServiceType {
    #[serde(alias = "general_consultation", alias = "consultation", alias = "general")]
    GeneralConsultation,

    #[serde(alias = "initial_consultation", alias = "initial", alias = "new_patient")]
    InitialConsultation,

    #[serde(alias = "follow_up", alias = "followup")]
    FollowUp,

    #[serde(alias = "prescription", alias = "prescription_renewal")]
    Prescription,

    #[serde(alias = "urgent", alias = "urgent_consultation")]
    Urgent,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::GeneralConsultation => write!(f, "GeneralConsultation"),
            ServiceType::InitialConsultation => write!(f, "InitialConsultation"),
            ServiceType::FollowUp => write!(f, "FollowUp"),
            ServiceType::Prescription => write!(f, "Prescription"),
            ServiceType::Urgent => write!(f, "Urgent"),
        }
    }
}

/// One catalog row: the fixed duration and the current price of a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub service_type: ServiceType,
    pub duration_minutes: u32,
    pub price: f64,
    pub display_name: String,
}

impl CatalogEntry {
    pub fn new(
        service_type: ServiceType,
        duration_minutes: u32,
        price: f64,
        display_name: &str,
    ) -> Self {
        Self {
            service_type,
            duration_minutes,
            price,
            display_name: display_name.to_string(),
        }
    }

    /// The standard catalog every deployment starts from.
    pub fn standard_entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new(ServiceType::GeneralConsultation, 30, 29.0, "General consultation"),
            CatalogEntry::new(ServiceType::InitialConsultation, 45, 49.0, "Initial consultation"),
            CatalogEntry::new(ServiceType::FollowUp, 15, 19.0, "Follow-up"),
            CatalogEntry::new(ServiceType::Prescription, 15, 15.0, "Prescription renewal"),
            CatalogEntry::new(ServiceType::Urgent, 30, 59.0, "Urgent consultation"),
        ]
    }
}

// ==============================================================================
// APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One booked appointment. `time` is persisted in the same `"h:mm a"` layout
/// as the slot grid; the consumed slot range is always recomputed from the
/// catalog duration, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub date: NaiveDate,
    #[serde(with = "availability_cell::models::slot_time")]
    pub time: NaiveTime,
    pub service_type: ServiceType,
    pub status: AppointmentStatus,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn document_key(appointment_id: &str) -> DocumentKey {
        DocumentKey::new(APPOINTMENTS_COLLECTION, appointment_id)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub patient_id: String,
    pub date: NaiveDate,
    #[serde(with = "availability_cell::models::slot_time")]
    pub time: NaiveTime,
    pub service_type: ServiceType,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    #[serde(with = "availability_cell::models::slot_time")]
    pub new_time: NaiveTime,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Requested time is not available")]
    SlotUnavailable,

    #[error("Doctor {doctor_id} has no availability on {date}")]
    NoAvailabilityForDate { doctor_id: String, date: NaiveDate },

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidTransition(AppointmentStatus),

    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    #[error("Inconsistent scheduling state: {0}")]
    InconsistentState(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => {
                SchedulingError::InconsistentState(format!("document {} is missing", key))
            }
            StoreError::Malformed { key, reason } => {
                SchedulingError::InconsistentState(format!("document {}: {}", key, reason))
            }
            other => SchedulingError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<AvailabilityError> for SchedulingError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidWindow(msg) => SchedulingError::InvalidRequest(msg),
            e @ AvailabilityError::Malformed { .. } => {
                SchedulingError::InconsistentState(e.to_string())
            }
            AvailabilityError::StoreUnavailable(msg) => SchedulingError::StoreUnavailable(msg),
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            e @ SchedulingError::SlotUnavailable => AppError::Conflict(e.to_string()),
            e @ SchedulingError::NoAvailabilityForDate { .. } => AppError::Conflict(e.to_string()),
            e @ SchedulingError::InvalidTransition(_) => AppError::BadRequest(e.to_string()),
            SchedulingError::InvalidRequest(msg) => AppError::BadRequest(msg),
            e @ SchedulingError::InconsistentState(_) => AppError::Internal(e.to_string()),
            SchedulingError::StoreUnavailable(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use serde_json::json;

    #[test]
    fn service_type_accepts_snake_case_aliases() {
        let parsed: ServiceType = serde_json::from_value(json!("general_consultation")).unwrap();
        assert_eq!(parsed, ServiceType::GeneralConsultation);
        let parsed: ServiceType = serde_json::from_value(json!("FollowUp")).unwrap();
        assert_eq!(parsed, ServiceType::FollowUp);
    }

    #[test]
    fn appointment_round_trips_through_document_fields() {
        let appointment = Appointment {
            id: "a-1".to_string(),
            doctor_id: "doc-1".to_string(),
            patient_id: "pat-1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 16).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            service_type: ServiceType::GeneralConsultation,
            status: AppointmentStatus::Pending,
            price: 29.0,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["time"], "10:00 AM");
        assert_eq!(value["date"], "2026-03-16");
        assert_eq!(value["status"], "pending");
        assert!(value.get("notes").is_none());

        let parsed: Appointment = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.id, appointment.id);
        assert_eq!(parsed.time, appointment.time);
        assert_eq!(parsed.status, appointment.status);
    }

    #[test]
    fn standard_catalog_covers_every_service_type() {
        let entries = CatalogEntry::standard_entries();
        for service_type in [
            ServiceType::GeneralConsultation,
            ServiceType::InitialConsultation,
            ServiceType::FollowUp,
            ServiceType::Prescription,
            ServiceType::Urgent,
        ] {
            assert!(entries.iter().any(|entry| entry.service_type == service_type));
        }
    }
}
