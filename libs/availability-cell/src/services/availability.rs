// libs/availability-cell/src/services/availability.rs

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};

use shared_store::{DocumentStore, WriteOp};

use crate::models::{
    AvailabilityError, AvailabilityResponse, DateOutcome, SetAvailabilityRequest, SlotSet,
};
use crate::services::slots;

/// Store-backed availability operations for one doctor-date at a time.
/// Every mutation of a slot-set document goes through a store transaction;
/// the pure grid math lives in `slots`.
pub struct AvailabilityService<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> AvailabilityService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load the stored slot set for a doctor-date. Absent means the doctor
    /// has never declared availability for that date, not an error.
    pub async fn load(
        &self,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<Option<SlotSet>, AvailabilityError> {
        let key = SlotSet::document_key(doctor_id, date);
        match self.store.get(&key).await? {
            Some(document) => {
                let slot_set = document.parse::<SlotSet>().map_err(|err| {
                    AvailabilityError::Malformed {
                        doctor_id: doctor_id.to_string(),
                        date,
                        reason: err.to_string(),
                    }
                })?;
                Ok(Some(slot_set))
            }
            None => Ok(None),
        }
    }

    /// Full overwrite of one slot-set document.
    pub async fn save(&self, slot_set: &SlotSet) -> Result<(), AvailabilityError> {
        let key = SlotSet::document_key(&slot_set.doctor_id, slot_set.date);
        let fields = slot_set.to_fields().map_err(|err| AvailabilityError::Malformed {
            doctor_id: slot_set.doctor_id.clone(),
            date: slot_set.date,
            reason: err.to_string(),
        })?;
        self.store.set(&key, fields).await?;
        Ok(())
    }

    /// Re-declare the working window for one doctor-date. Runs as a single
    /// transaction over the slot-set document so a concurrent booking either
    /// lands before the merge (and stays booked) or replays after it.
    #[instrument(skip(self))]
    pub async fn merge_window(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        work_start: NaiveTime,
        work_end: NaiveTime,
    ) -> Result<SlotSet, AvailabilityError> {
        slots::validate_window(work_start, work_end)?;

        let key = SlotSet::document_key(doctor_id, date);
        let merged = self
            .store
            .run_transaction(vec![key.clone()], |snapshot| {
                let existing = match snapshot.get(&key) {
                    Some(document) => {
                        Some(document.parse::<SlotSet>().map_err(|err| {
                            AvailabilityError::Malformed {
                                doctor_id: doctor_id.to_string(),
                                date,
                                reason: err.to_string(),
                            }
                        })?)
                    }
                    None => None,
                };

                let merged =
                    slots::merge_window(existing.as_ref(), doctor_id, date, work_start, work_end);
                let fields = merged.to_fields().map_err(|err| AvailabilityError::Malformed {
                    doctor_id: doctor_id.to_string(),
                    date,
                    reason: err.to_string(),
                })?;

                Ok((merged, vec![WriteOp::set(key.clone(), fields)]))
            })
            .await
            .map_err(|err: shared_store::TransactionError<AvailabilityError>| err.flatten())?;

        info!(
            "Merged working window for doctor {} on {}: {} slots available",
            doctor_id,
            date,
            merged.available_slots.len()
        );
        Ok(merged)
    }

    /// Apply one working window to several dates. Each date is an
    /// independent unit of work: a failure is recorded in its outcome entry
    /// and the remaining dates still proceed.
    pub async fn set_availability(
        &self,
        doctor_id: &str,
        request: &SetAvailabilityRequest,
    ) -> Result<Vec<DateOutcome>, AvailabilityError> {
        slots::validate_window(request.work_start, request.work_end)?;
        debug!(
            "Setting availability for doctor {} across {} dates",
            doctor_id,
            request.dates.len()
        );

        let mut outcomes = Vec::with_capacity(request.dates.len());
        for &date in &request.dates {
            match self
                .merge_window(doctor_id, date, request.work_start, request.work_end)
                .await
            {
                Ok(_) => outcomes.push(DateOutcome::ok(date)),
                Err(err) => {
                    warn!(
                        "Availability update failed for doctor {} on {}: {}",
                        doctor_id, date, err
                    );
                    outcomes.push(DateOutcome::failed(date, &err));
                }
            }
        }
        Ok(outcomes)
    }

    /// Read-side view of one date. A date without a stored slot set answers
    /// with an empty slot list.
    pub async fn get_availability(
        &self,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<AvailabilityResponse, AvailabilityError> {
        match self.load(doctor_id, date).await? {
            Some(slot_set) => Ok(AvailabilityResponse::from_slot_set(&slot_set)),
            None => Ok(AvailabilityResponse::empty(doctor_id, date)),
        }
    }

    /// Read-side view of an inclusive date range; dates without a stored
    /// slot set are omitted. An inverted range is simply empty.
    pub async fn get_availability_range(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityResponse>, AvailabilityError> {
        debug!(
            "Fetching availability for doctor {} from {} to {}",
            doctor_id, from, to
        );

        let mut responses = Vec::new();
        let mut date = from;
        while date <= to {
            if let Some(slot_set) = self.load(doctor_id, date).await? {
                responses.push(AvailabilityResponse::from_slot_set(&slot_set));
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(responses)
    }
}
