// libs/availability-cell/src/models.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;
use shared_store::{DocumentKey, StoreError};

// ============================================================================
// TIME-OF-DAY BOUNDARY
// ============================================================================

/// Persisted wall-clock format for slot instants ("9:00 AM", "12:15 PM").
/// Fixed and locale-independent; every stored time round-trips exactly.
pub const SLOT_TIME_FORMAT: &str = "%-I:%M %p";

pub fn format_slot_time(time: &NaiveTime) -> String {
    time.format(SLOT_TIME_FORMAT).to_string()
}

pub fn parse_slot_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, SLOT_TIME_FORMAT)
}

/// Serde adapter: times cross the store boundary as `"h:mm a"` strings and
/// are parsed exactly once, here.
pub mod slot_time {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_slot_time(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_slot_time(&raw).map_err(D::Error::custom)
    }
}

/// Same adapter for the slot list.
pub mod slot_time_vec {
    use chrono::NaiveTime;
    use serde::ser::SerializeSeq;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        times: &[NaiveTime],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(times.len()))?;
        for time in times {
            seq.serialize_element(&super::format_slot_time(time))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NaiveTime>, D::Error> {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.iter()
            .map(|s| super::parse_slot_time(s).map_err(D::Error::custom))
            .collect()
    }
}

// ============================================================================
// SLOT SET
// ============================================================================

pub const AVAILABILITY_COLLECTION: &str = "availability";

/// A doctor's working window for one calendar date plus the instants still
/// bookable. `available_slots` is sorted, 15-minute aligned, and confined to
/// `[work_start, work_end)`; everything on the grid but not in the list is
/// held by a non-cancelled appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSet {
    pub doctor_id: String,
    pub date: NaiveDate,
    #[serde(with = "slot_time")]
    pub work_start: NaiveTime,
    #[serde(with = "slot_time")]
    pub work_end: NaiveTime,
    #[serde(with = "slot_time_vec")]
    pub available_slots: Vec<NaiveTime>,
    pub updated_at: DateTime<Utc>,
}

impl SlotSet {
    pub fn document_id(doctor_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", doctor_id, date)
    }

    pub fn document_key(doctor_id: &str, date: NaiveDate) -> DocumentKey {
        DocumentKey::new(AVAILABILITY_COLLECTION, Self::document_id(doctor_id, date))
    }

    pub fn to_fields(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// ============================================================================
// REQUESTS / RESPONSES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SetAvailabilityRequest {
    pub dates: Vec<NaiveDate>,
    #[serde(with = "slot_time")]
    pub work_start: NaiveTime,
    #[serde(with = "slot_time")]
    pub work_end: NaiveTime,
}

/// Per-date result of a bulk availability update. Dates are independent
/// units of work; callers learn exactly which ones failed.
#[derive(Debug, Clone, Serialize)]
pub struct DateOutcome {
    pub date: NaiveDate,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DateOutcome {
    pub fn ok(date: NaiveDate) -> Self {
        Self { date, success: true, error: None }
    }

    pub fn failed(date: NaiveDate, error: impl ToString) -> Self {
        Self { date, success: false, error: Some(error.to_string()) }
    }
}

/// Read-side view of one date. Times are formatted at this presentation
/// edge; a date with no stored SlotSet answers with an empty slot list.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub doctor_id: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_end: Option<String>,
    pub available_slots: Vec<String>,
}

impl AvailabilityResponse {
    pub fn from_slot_set(slot_set: &SlotSet) -> Self {
        Self {
            doctor_id: slot_set.doctor_id.clone(),
            date: slot_set.date,
            work_start: Some(format_slot_time(&slot_set.work_start)),
            work_end: Some(format_slot_time(&slot_set.work_end)),
            available_slots: slot_set.available_slots.iter().map(format_slot_time).collect(),
        }
    }

    pub fn empty(doctor_id: &str, date: NaiveDate) -> Self {
        Self {
            doctor_id: doctor_id.to_string(),
            date,
            work_start: None,
            work_end: None,
            available_slots: Vec::new(),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Invalid working window: {0}")]
    InvalidWindow(String),

    #[error("Malformed availability document for doctor {doctor_id} on {date}: {reason}")]
    Malformed {
        doctor_id: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for AvailabilityError {
    fn from(err: StoreError) -> Self {
        AvailabilityError::StoreUnavailable(err.to_string())
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidWindow(msg) => AppError::BadRequest(msg),
            e @ AvailabilityError::Malformed { .. } => AppError::Internal(e.to_string()),
            AvailabilityError::StoreUnavailable(msg) => AppError::Database(msg),
        }
    }
}
