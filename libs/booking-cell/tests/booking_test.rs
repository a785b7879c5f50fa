use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use futures::future::join_all;

use availability_cell::models::SlotSet;
use availability_cell::services::availability::AvailabilityService;
use availability_cell::services::slots;
use booking_cell::models::{
    AppointmentStatus, BookAppointmentRequest, CatalogEntry, SchedulingError, ServiceType,
};
use booking_cell::services::booking::BookingService;
use booking_cell::services::catalog::ServiceCatalog;
use shared_store::{DocumentStore, MemoryStore};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn request(
    doctor_id: &str,
    patient_id: &str,
    date: NaiveDate,
    time: NaiveTime,
    service_type: ServiceType,
) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id: doctor_id.to_string(),
        patient_id: patient_id.to_string(),
        date,
        time,
        service_type,
        notes: None,
    }
}

/// Store with a 9:00-17:00 window already declared for doc-1 on the date.
async fn seeded(
    date: NaiveDate,
) -> (
    Arc<MemoryStore>,
    AvailabilityService<MemoryStore>,
    BookingService<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::new());
    let availability = AvailabilityService::new(store.clone());
    availability
        .merge_window("doc-1", date, t(9, 0), t(17, 0))
        .await
        .unwrap();
    let booking = BookingService::new(store.clone());
    (store, availability, booking)
}

#[tokio::test]
async fn book_consumes_the_occupied_range() {
    let date = d(2026, 3, 16);
    let (_, availability, booking) = seeded(date).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();

    assert!(!appointment.id.is_empty());
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.price, 29.0);

    let slot_set = availability.load("doc-1", date).await.unwrap().unwrap();
    assert!(!slot_set.available_slots.contains(&t(10, 0)));
    assert!(!slot_set.available_slots.contains(&t(10, 15)));
    assert!(slot_set.available_slots.contains(&t(9, 45)));
    assert!(slot_set.available_slots.contains(&t(10, 30)));
    assert_eq!(slot_set.available_slots.len(), 32 - 2);
}

#[tokio::test]
async fn overlapping_bookings_fail_until_a_free_slot() {
    let date = d(2026, 3, 16);
    let (_, _, booking) = seeded(date).await;

    booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();

    // Same start time.
    let result = booking
        .book(request("doc-1", "pat-2", date, t(10, 0), ServiceType::GeneralConsultation))
        .await;
    assert_matches!(result, Err(SchedulingError::SlotUnavailable));

    // Overlapping the second half of the first booking.
    let result = booking
        .book(request("doc-1", "pat-2", date, t(10, 15), ServiceType::GeneralConsultation))
        .await;
    assert_matches!(result, Err(SchedulingError::SlotUnavailable));

    // First instant past the booked range.
    booking
        .book(request("doc-1", "pat-2", date, t(10, 30), ServiceType::GeneralConsultation))
        .await
        .unwrap();
}

#[tokio::test]
async fn booking_a_date_without_availability_fails() {
    let store = Arc::new(MemoryStore::new());
    let booking = BookingService::new(store);

    let result = booking
        .book(request(
            "doc-1",
            "pat-1",
            d(2026, 3, 16),
            t(10, 0),
            ServiceType::GeneralConsultation,
        ))
        .await;

    assert_matches!(result, Err(SchedulingError::NoAvailabilityForDate { .. }));
}

#[tokio::test]
async fn booking_off_the_grid_is_rejected() {
    let date = d(2026, 3, 16);
    let (_, _, booking) = seeded(date).await;

    let time = NaiveTime::from_hms_opt(10, 7, 0).unwrap();
    let result = booking
        .book(request("doc-1", "pat-1", date, time, ServiceType::GeneralConsultation))
        .await;

    assert_matches!(result, Err(SchedulingError::InvalidRequest(_)));
}

#[tokio::test]
async fn booking_outside_the_window_is_unavailable() {
    let date = d(2026, 3, 16);
    let store = Arc::new(MemoryStore::new());
    let availability = AvailabilityService::new(store.clone());
    availability
        .merge_window("doc-1", date, t(9, 0), t(12, 0))
        .await
        .unwrap();
    let booking = BookingService::new(store);

    let result = booking
        .book(request("doc-1", "pat-1", date, t(14, 0), ServiceType::GeneralConsultation))
        .await;

    assert_matches!(result, Err(SchedulingError::SlotUnavailable));
}

#[tokio::test]
async fn cancel_restores_the_exact_prebook_state() {
    let date = d(2026, 3, 16);
    let (_, availability, booking) = seeded(date).await;

    let before = availability
        .load("doc-1", date)
        .await
        .unwrap()
        .unwrap()
        .available_slots;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    let cancelled = booking
        .cancel(&appointment.id, Some("patient request"))
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.notes.as_deref(), Some("Cancelled: patient request"));

    let after = availability
        .load("doc-1", date)
        .await
        .unwrap()
        .unwrap()
        .available_slots;
    assert_eq!(after, before);
}

#[tokio::test]
async fn cancel_clips_the_restore_to_the_current_window() {
    let date = d(2026, 3, 16);
    let (_, availability, booking) = seeded(date).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(16, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();

    // The window shrinks under the booking; 16:00 leaves the grid.
    availability
        .merge_window("doc-1", date, t(9, 0), t(12, 0))
        .await
        .unwrap();

    let cancelled = booking.cancel(&appointment.id, None).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    // Nothing from the out-of-window range is resurrected.
    let slot_set = availability.load("doc-1", date).await.unwrap().unwrap();
    assert_eq!(slot_set.available_slots, slots::full_grid(t(9, 0), t(12, 0)));
}

#[tokio::test]
async fn cancel_is_not_repeatable() {
    let date = d(2026, 3, 16);
    let (_, _, booking) = seeded(date).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    booking.cancel(&appointment.id, None).await.unwrap();

    let result = booking.cancel(&appointment.id, None).await;
    assert_matches!(result, Err(SchedulingError::InvalidTransition(_)));
}

#[tokio::test]
async fn cancel_of_an_unknown_appointment_is_not_found() {
    let date = d(2026, 3, 16);
    let (_, _, booking) = seeded(date).await;

    let result = booking.cancel("missing-id", None).await;
    assert_matches!(result, Err(SchedulingError::NotFound));
}

#[tokio::test]
async fn cancel_with_a_missing_slot_set_surfaces_inconsistency() {
    let date = d(2026, 3, 16);
    let (store, _, booking) = seeded(date).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();

    store
        .delete(&SlotSet::document_key("doc-1", date))
        .await
        .unwrap();

    let result = booking.cancel(&appointment.id, None).await;
    assert_matches!(result, Err(SchedulingError::InconsistentState(_)));

    // The abort left the record untouched.
    let record = booking.get_appointment(&appointment.id).await.unwrap();
    assert_eq!(record.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn confirm_is_a_status_only_transition() {
    let date = d(2026, 3, 16);
    let (_, availability, booking) = seeded(date).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    let slots_before = availability
        .load("doc-1", date)
        .await
        .unwrap()
        .unwrap()
        .available_slots;

    let confirmed = booking.confirm(&appointment.id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let slots_after = availability
        .load("doc-1", date)
        .await
        .unwrap()
        .unwrap()
        .available_slots;
    assert_eq!(slots_after, slots_before);

    let result = booking.confirm(&appointment.id).await;
    assert_matches!(result, Err(SchedulingError::InvalidTransition(_)));
}

#[tokio::test]
async fn reschedule_slides_within_the_same_day() {
    let date = d(2026, 3, 16);
    let (_, availability, booking) = seeded(date).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();

    // 10:15 overlaps the appointment's own range; the slide must succeed.
    let rescheduled = booking
        .reschedule(&appointment.id, date, t(10, 15))
        .await
        .unwrap();
    assert_eq!(rescheduled.time, t(10, 15));
    assert_eq!(rescheduled.status, AppointmentStatus::Pending);

    let slot_set = availability.load("doc-1", date).await.unwrap().unwrap();
    assert!(slot_set.available_slots.contains(&t(10, 0)));
    assert!(!slot_set.available_slots.contains(&t(10, 15)));
    assert!(!slot_set.available_slots.contains(&t(10, 30)));
}

#[tokio::test]
async fn reschedule_moves_across_dates() {
    let first = d(2026, 3, 16);
    let second = d(2026, 3, 17);
    let (_, availability, booking) = seeded(first).await;
    availability
        .merge_window("doc-1", second, t(9, 0), t(17, 0))
        .await
        .unwrap();

    let appointment = booking
        .book(request("doc-1", "pat-1", first, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    booking.confirm(&appointment.id).await.unwrap();

    let rescheduled = booking
        .reschedule(&appointment.id, second, t(11, 0))
        .await
        .unwrap();
    assert_eq!(rescheduled.date, second);
    assert_eq!(rescheduled.time, t(11, 0));
    // Reschedule preserves status.
    assert_eq!(rescheduled.status, AppointmentStatus::Confirmed);

    let old_day = availability.load("doc-1", first).await.unwrap().unwrap();
    assert_eq!(old_day.available_slots.len(), 32);

    let new_day = availability.load("doc-1", second).await.unwrap().unwrap();
    assert!(!new_day.available_slots.contains(&t(11, 0)));
    assert!(!new_day.available_slots.contains(&t(11, 15)));
    assert_eq!(new_day.available_slots.len(), 32 - 2);
}

#[tokio::test]
async fn failed_reschedule_changes_nothing() {
    let first = d(2026, 3, 16);
    let second = d(2026, 3, 17);
    let (_, availability, booking) = seeded(first).await;
    availability
        .merge_window("doc-1", second, t(9, 0), t(17, 0))
        .await
        .unwrap();

    booking
        .book(request("doc-1", "pat-1", second, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    let movable = booking
        .book(request("doc-1", "pat-2", first, t(11, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();

    // The target range on the second day is already taken.
    let result = booking.reschedule(&movable.id, second, t(10, 15)).await;
    assert_matches!(result, Err(SchedulingError::SlotUnavailable));

    // Original booking and both days are untouched.
    let record = booking.get_appointment(&movable.id).await.unwrap();
    assert_eq!(record.date, first);
    assert_eq!(record.time, t(11, 0));

    let old_day = availability.load("doc-1", first).await.unwrap().unwrap();
    assert!(!old_day.available_slots.contains(&t(11, 0)));
    assert!(!old_day.available_slots.contains(&t(11, 15)));

    let new_day = availability.load("doc-1", second).await.unwrap().unwrap();
    assert!(!new_day.available_slots.contains(&t(10, 0)));
    assert!(new_day.available_slots.contains(&t(10, 30)));
    assert_eq!(new_day.available_slots.len(), 32 - 2);
}

#[tokio::test]
async fn reschedule_needs_availability_on_the_target_date() {
    let first = d(2026, 3, 16);
    let (_, _, booking) = seeded(first).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", first, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();

    let result = booking
        .reschedule(&appointment.id, d(2026, 3, 20), t(10, 0))
        .await;
    assert_matches!(result, Err(SchedulingError::NoAvailabilityForDate { .. }));

    let record = booking.get_appointment(&appointment.id).await.unwrap();
    assert_eq!(record.date, first);
}

#[tokio::test]
async fn cancelled_appointments_cannot_be_rescheduled() {
    let date = d(2026, 3, 16);
    let (_, _, booking) = seeded(date).await;

    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    booking.cancel(&appointment.id, None).await.unwrap();

    let result = booking.reschedule(&appointment.id, date, t(11, 0)).await;
    assert_matches!(result, Err(SchedulingError::InvalidTransition(_)));
}

#[tokio::test]
async fn price_is_captured_at_booking_time() {
    let date = d(2026, 3, 16);
    let store = Arc::new(MemoryStore::new());
    let availability = AvailabilityService::new(store.clone());
    availability
        .merge_window("doc-1", date, t(9, 0), t(17, 0))
        .await
        .unwrap();

    let old_catalog = Arc::new(ServiceCatalog::with_entries(vec![CatalogEntry::new(
        ServiceType::GeneralConsultation,
        30,
        35.0,
        "General consultation",
    )]));
    let booking = BookingService::with_catalog(store.clone(), old_catalog);
    let appointment = booking
        .book(request("doc-1", "pat-1", date, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    assert_eq!(appointment.price, 35.0);

    // A later catalog price does not rewrite the stored record.
    let current = BookingService::new(store);
    let record = current.get_appointment(&appointment.id).await.unwrap();
    assert_eq!(record.price, 35.0);
}

#[tokio::test]
async fn durations_span_the_right_number_of_slots() {
    let date = d(2026, 3, 16);
    let (_, _, booking) = seeded(date).await;

    // 45 minutes holds 9:00, 9:15 and 9:30.
    booking
        .book(request("doc-1", "pat-1", date, t(9, 0), ServiceType::InitialConsultation))
        .await
        .unwrap();

    let result = booking
        .book(request("doc-1", "pat-2", date, t(9, 30), ServiceType::FollowUp))
        .await;
    assert_matches!(result, Err(SchedulingError::SlotUnavailable));

    booking
        .book(request("doc-1", "pat-2", date, t(9, 45), ServiceType::FollowUp))
        .await
        .unwrap();
}

#[tokio::test]
async fn listings_filter_by_owner_and_date() {
    let first = d(2026, 3, 16);
    let second = d(2026, 3, 17);
    let (_, availability, booking) = seeded(first).await;
    availability
        .merge_window("doc-1", second, t(9, 0), t(17, 0))
        .await
        .unwrap();

    booking
        .book(request("doc-1", "pat-1", first, t(10, 0), ServiceType::GeneralConsultation))
        .await
        .unwrap();
    booking
        .book(request("doc-1", "pat-1", second, t(9, 0), ServiceType::FollowUp))
        .await
        .unwrap();
    booking
        .book(request("doc-1", "pat-2", first, t(9, 0), ServiceType::FollowUp))
        .await
        .unwrap();

    let patient = booking.get_patient_appointments("pat-1").await.unwrap();
    assert_eq!(patient.len(), 2);
    // Sorted by date then time.
    assert_eq!(patient[0].date, first);
    assert_eq!(patient[1].date, second);

    let day = booking
        .get_doctor_appointments("doc-1", Some(first))
        .await
        .unwrap();
    assert_eq!(day.len(), 2);
    assert_eq!(day[0].time, t(9, 0));
    assert_eq!(day[1].time, t(10, 0));

    let all = booking.get_doctor_appointments("doc-1", None).await.unwrap();
    assert_eq!(all.len(), 3);

    let other = booking.get_patient_appointments("pat-3").await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_admit_exactly_one() {
    let date = d(2026, 3, 16);
    let store = Arc::new(MemoryStore::with_retry(50, Duration::from_millis(1)));
    let availability = AvailabilityService::new(store.clone());
    availability
        .merge_window("doc-1", date, t(9, 0), t(17, 0))
        .await
        .unwrap();

    let booking = Arc::new(BookingService::new(store.clone()));
    let mut handles = Vec::new();
    for i in 0..8 {
        let booking = booking.clone();
        handles.push(tokio::spawn(async move {
            booking
                .book(request(
                    "doc-1",
                    &format!("pat-{}", i),
                    date,
                    t(10, 0),
                    ServiceType::GeneralConsultation,
                ))
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(SchedulingError::SlotUnavailable) => conflicts += 1,
            Err(other) => panic!("unexpected booking error: {}", other),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);

    // The grid accounts for exactly one booking.
    let slot_set = availability.load("doc-1", date).await.unwrap().unwrap();
    assert!(!slot_set.available_slots.contains(&t(10, 0)));
    assert!(!slot_set.available_slots.contains(&t(10, 15)));
    assert_eq!(slot_set.available_slots.len(), 32 - 2);
}
