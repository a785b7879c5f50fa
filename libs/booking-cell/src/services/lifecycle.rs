// libs/booking-cell/src/services/lifecycle.rs

use tracing::{debug, warn};

use crate::models::{AppointmentStatus, SchedulingError};

/// Status machine for appointment records. Transitions that are not listed
/// are rejected, never coerced.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Validating status transition from {} to {}",
            current_status, new_status
        );

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(SchedulingError::InvalidTransition(current_status.clone()));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(
        &self,
        current_status: &AppointmentStatus,
    ) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => {
                vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => vec![AppointmentStatus::Cancelled],
            // Terminal state - no transitions allowed
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Reschedule moves an appointment in time without changing its status,
    /// so it is allowed from any non-terminal status.
    pub fn can_reschedule(&self, current_status: &AppointmentStatus) -> bool {
        *current_status != AppointmentStatus::Cancelled
    }
}
