// libs/booking-cell/src/services/booking.rs

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use availability_cell::models::{format_slot_time, SlotSet};
use availability_cell::services::slots;
use shared_store::{Document, DocumentStore, WriteOp};

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, SchedulingError,
    APPOINTMENTS_COLLECTION,
};
use crate::services::catalog::ServiceCatalog;
use crate::services::lifecycle::AppointmentLifecycleService;

/// The booking engine. Every mutation runs as one store transaction over
/// the touched appointment record and slot-set documents, so the two sides
/// of the accounting can never be written half-way.
pub struct BookingService<S> {
    store: Arc<S>,
    catalog: Arc<ServiceCatalog>,
    lifecycle: AppointmentLifecycleService,
}

impl<S: DocumentStore> BookingService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_catalog(store, Arc::new(ServiceCatalog::standard()))
    }

    pub fn with_catalog(store: Arc<S>, catalog: Arc<ServiceCatalog>) -> Self {
        Self {
            store,
            catalog,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Book an appointment: consume the occupied slot range and create the
    /// pending record, both in one transaction.
    #[instrument(skip(self, request))]
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Booking {} for patient {} with doctor {} on {} at {}",
            request.service_type,
            request.patient_id,
            request.doctor_id,
            request.date,
            format_slot_time(&request.time)
        );

        if !slots::is_aligned(request.time) {
            return Err(SchedulingError::InvalidRequest(format!(
                "Appointment time {} is not on the 15-minute grid",
                format_slot_time(&request.time)
            )));
        }
        let entry = self.catalog.resolve(&request.service_type)?.clone();

        let slot_key = SlotSet::document_key(&request.doctor_id, request.date);
        let appointment_id = Uuid::new_v4().to_string();
        let record_key = Appointment::document_key(&appointment_id);

        let appointment = self
            .store
            .run_transaction(vec![slot_key.clone()], |snapshot| {
                let slot_document = snapshot.get(&slot_key).ok_or_else(|| {
                    SchedulingError::NoAvailabilityForDate {
                        doctor_id: request.doctor_id.clone(),
                        date: request.date,
                    }
                })?;
                let mut slot_set: SlotSet = slot_document.parse().map_err(|err| {
                    SchedulingError::InconsistentState(format!("slot set {}: {}", slot_key, err))
                })?;

                let occupied = slots::occupied_range(request.time, entry.duration_minutes);
                if !slots::consume_range(&mut slot_set, &occupied) {
                    return Err(SchedulingError::SlotUnavailable);
                }
                slot_set.updated_at = Utc::now();

                let now = Utc::now();
                let appointment = Appointment {
                    id: appointment_id.clone(),
                    doctor_id: request.doctor_id.clone(),
                    patient_id: request.patient_id.clone(),
                    date: request.date,
                    time: request.time,
                    service_type: request.service_type.clone(),
                    status: AppointmentStatus::Pending,
                    price: entry.price,
                    notes: request.notes.clone(),
                    created_at: now,
                    updated_at: now,
                };

                let writes = vec![
                    WriteOp::set(slot_key.clone(), fields_of(&slot_set)?),
                    WriteOp::set(record_key.clone(), fields_of(&appointment)?),
                ];
                Ok((appointment, writes))
            })
            .await
            .map_err(|err: shared_store::TransactionError<SchedulingError>| err.flatten())?;

        info!(
            "Booked appointment {} with doctor {} on {} at {}",
            appointment.id,
            appointment.doctor_id,
            appointment.date,
            format_slot_time(&appointment.time)
        );
        Ok(appointment)
    }

    /// Cancel an appointment and give its slots back to the grid. The
    /// occupied range is recomputed from the catalog at cancel time and
    /// clipped to whatever the working window is now.
    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        appointment_id: &str,
        reason: Option<&str>,
    ) -> Result<Appointment, SchedulingError> {
        let record_key = Appointment::document_key(appointment_id);
        let current = self.get_appointment(appointment_id).await?;
        let entry = self.catalog.resolve(&current.service_type)?.clone();
        let slot_key = SlotSet::document_key(&current.doctor_id, current.date);

        let cancelled = self
            .store
            .run_transaction(vec![record_key.clone(), slot_key.clone()], |snapshot| {
                let record = snapshot.get(&record_key).ok_or(SchedulingError::NotFound)?;
                let mut appointment: Appointment = record.parse().map_err(|err| {
                    SchedulingError::InconsistentState(format!(
                        "appointment {}: {}",
                        record_key, err
                    ))
                })?;
                self.lifecycle.validate_status_transition(
                    &appointment.status,
                    &AppointmentStatus::Cancelled,
                )?;

                let slot_document = snapshot.get(&slot_key).ok_or_else(|| {
                    warn!(
                        "Slot set {} is missing for live appointment {}",
                        slot_key, appointment_id
                    );
                    SchedulingError::InconsistentState(format!(
                        "appointment {} references missing slot set {}",
                        appointment_id, slot_key
                    ))
                })?;
                let mut slot_set: SlotSet = slot_document.parse().map_err(|err| {
                    SchedulingError::InconsistentState(format!("slot set {}: {}", slot_key, err))
                })?;

                let occupied = slots::occupied_range(appointment.time, entry.duration_minutes);
                slots::restore_range(&mut slot_set, &occupied);
                slot_set.updated_at = Utc::now();

                appointment.status = AppointmentStatus::Cancelled;
                if let Some(reason) = reason {
                    appointment.notes = Some(match appointment.notes.take() {
                        Some(notes) => format!("{} | Cancelled: {}", notes, reason),
                        None => format!("Cancelled: {}", reason),
                    });
                }
                appointment.updated_at = Utc::now();

                let writes = vec![
                    WriteOp::set(slot_key.clone(), fields_of(&slot_set)?),
                    WriteOp::set(record_key.clone(), fields_of(&appointment)?),
                ];
                Ok((appointment, writes))
            })
            .await
            .map_err(|err: shared_store::TransactionError<SchedulingError>| err.flatten())?;

        info!("Cancelled appointment {}", appointment_id);
        Ok(cancelled)
    }

    /// Move an appointment to a new date or time: the cancel-side restore
    /// and the book-side consume happen in the same transaction, so a
    /// failed reschedule leaves the original booking fully intact.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: &str,
        new_date: NaiveDate,
        new_time: NaiveTime,
    ) -> Result<Appointment, SchedulingError> {
        if !slots::is_aligned(new_time) {
            return Err(SchedulingError::InvalidRequest(format!(
                "Appointment time {} is not on the 15-minute grid",
                format_slot_time(&new_time)
            )));
        }

        let record_key = Appointment::document_key(appointment_id);
        let current = self.get_appointment(appointment_id).await?;
        if !self.lifecycle.can_reschedule(&current.status) {
            return Err(SchedulingError::InvalidTransition(current.status));
        }
        let entry = self.catalog.resolve(&current.service_type)?.clone();

        let old_slot_key = SlotSet::document_key(&current.doctor_id, current.date);
        let new_slot_key = SlotSet::document_key(&current.doctor_id, new_date);
        let same_day = current.date == new_date;

        let read_keys = if same_day {
            vec![record_key.clone(), old_slot_key.clone()]
        } else {
            vec![
                record_key.clone(),
                old_slot_key.clone(),
                new_slot_key.clone(),
            ]
        };

        let rescheduled = self
            .store
            .run_transaction(read_keys, |snapshot| {
                let record = snapshot.get(&record_key).ok_or(SchedulingError::NotFound)?;
                let mut appointment: Appointment = record.parse().map_err(|err| {
                    SchedulingError::InconsistentState(format!(
                        "appointment {}: {}",
                        record_key, err
                    ))
                })?;
                if !self.lifecycle.can_reschedule(&appointment.status) {
                    return Err(SchedulingError::InvalidTransition(appointment.status));
                }

                let old_document = snapshot.get(&old_slot_key).ok_or_else(|| {
                    warn!(
                        "Slot set {} is missing for live appointment {}",
                        old_slot_key, appointment_id
                    );
                    SchedulingError::InconsistentState(format!(
                        "appointment {} references missing slot set {}",
                        appointment_id, old_slot_key
                    ))
                })?;
                let mut old_slot_set: SlotSet = old_document.parse().map_err(|err| {
                    SchedulingError::InconsistentState(format!(
                        "slot set {}: {}",
                        old_slot_key, err
                    ))
                })?;

                let old_occupied = slots::occupied_range(appointment.time, entry.duration_minutes);
                let new_occupied = slots::occupied_range(new_time, entry.duration_minutes);

                let mut writes = Vec::new();
                if same_day {
                    // Restore first so the appointment can slide into space
                    // it currently holds.
                    slots::restore_range(&mut old_slot_set, &old_occupied);
                    if !slots::consume_range(&mut old_slot_set, &new_occupied) {
                        return Err(SchedulingError::SlotUnavailable);
                    }
                    old_slot_set.updated_at = Utc::now();
                    writes.push(WriteOp::set(old_slot_key.clone(), fields_of(&old_slot_set)?));
                } else {
                    let new_document = snapshot.get(&new_slot_key).ok_or_else(|| {
                        SchedulingError::NoAvailabilityForDate {
                            doctor_id: appointment.doctor_id.clone(),
                            date: new_date,
                        }
                    })?;
                    let mut new_slot_set: SlotSet = new_document.parse().map_err(|err| {
                        SchedulingError::InconsistentState(format!(
                            "slot set {}: {}",
                            new_slot_key, err
                        ))
                    })?;

                    slots::restore_range(&mut old_slot_set, &old_occupied);
                    if !slots::consume_range(&mut new_slot_set, &new_occupied) {
                        return Err(SchedulingError::SlotUnavailable);
                    }
                    old_slot_set.updated_at = Utc::now();
                    new_slot_set.updated_at = Utc::now();
                    writes.push(WriteOp::set(old_slot_key.clone(), fields_of(&old_slot_set)?));
                    writes.push(WriteOp::set(new_slot_key.clone(), fields_of(&new_slot_set)?));
                }

                appointment.date = new_date;
                appointment.time = new_time;
                appointment.updated_at = Utc::now();
                writes.push(WriteOp::set(record_key.clone(), fields_of(&appointment)?));

                Ok((appointment, writes))
            })
            .await
            .map_err(|err: shared_store::TransactionError<SchedulingError>| err.flatten())?;

        info!(
            "Rescheduled appointment {} to {} at {}",
            appointment_id,
            new_date,
            format_slot_time(&new_time)
        );
        Ok(rescheduled)
    }

    /// Status-only transition to confirmed. No slot accounting changes.
    pub async fn confirm(&self, appointment_id: &str) -> Result<Appointment, SchedulingError> {
        let record_key = Appointment::document_key(appointment_id);

        let confirmed = self
            .store
            .run_transaction(vec![record_key.clone()], |snapshot| {
                let record = snapshot.get(&record_key).ok_or(SchedulingError::NotFound)?;
                let mut appointment: Appointment = record.parse().map_err(|err| {
                    SchedulingError::InconsistentState(format!(
                        "appointment {}: {}",
                        record_key, err
                    ))
                })?;
                self.lifecycle.validate_status_transition(
                    &appointment.status,
                    &AppointmentStatus::Confirmed,
                )?;
                appointment.status = AppointmentStatus::Confirmed;
                appointment.updated_at = Utc::now();

                let writes = vec![WriteOp::set(record_key.clone(), fields_of(&appointment)?)];
                Ok((appointment, writes))
            })
            .await
            .map_err(|err: shared_store::TransactionError<SchedulingError>| err.flatten())?;

        info!("Confirmed appointment {}", appointment_id);
        Ok(confirmed)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Appointment, SchedulingError> {
        let key = Appointment::document_key(appointment_id);
        let document = self.store.get(&key).await?.ok_or(SchedulingError::NotFound)?;
        document.parse().map_err(|err| {
            SchedulingError::InconsistentState(format!("appointment {}: {}", key, err))
        })
    }

    pub async fn get_patient_appointments(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let documents = self
            .store
            .list(APPOINTMENTS_COLLECTION, &[("patient_id", patient_id)])
            .await?;
        parse_appointments(documents)
    }

    pub async fn get_doctor_appointments(
        &self,
        doctor_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let date_filter = date.map(|d| d.to_string());
        let mut filters: Vec<(&str, &str)> = vec![("doctor_id", doctor_id)];
        if let Some(ref date_value) = date_filter {
            filters.push(("date", date_value.as_str()));
        }

        let documents = self.store.list(APPOINTMENTS_COLLECTION, &filters).await?;
        parse_appointments(documents)
    }
}

fn fields_of<T: Serialize>(value: &T) -> Result<Value, SchedulingError> {
    serde_json::to_value(value)
        .map_err(|err| SchedulingError::InconsistentState(format!("serialize: {}", err)))
}

fn parse_appointments(documents: Vec<Document>) -> Result<Vec<Appointment>, SchedulingError> {
    let mut appointments = documents
        .iter()
        .map(|document| document.parse::<Appointment>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| SchedulingError::InconsistentState(format!("appointment record: {}", err)))?;
    appointments.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
    Ok(appointments)
}
