// libs/availability-cell/src/services/slots.rs
//
// Pure slot-grid math. Everything here works on minutes-since-midnight and
// never touches the store; the transactional code in `availability.rs` and
// in the booking engine composes these helpers inside transactions.

use chrono::{NaiveDate, NaiveTime, Timelike, Utc};

use crate::models::{format_slot_time, AvailabilityError, SlotSet};

pub const SLOT_INTERVAL_MINUTES: u32 = 15;

const MINUTES_PER_DAY: u32 = 24 * 60;

pub fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

// Callers keep `minutes` strictly below MINUTES_PER_DAY.
fn time_from_minutes(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
}

fn align_up(minutes: u32) -> u32 {
    minutes.div_ceil(SLOT_INTERVAL_MINUTES) * SLOT_INTERVAL_MINUTES
}

/// True when the instant sits on the 15-minute grid.
pub fn is_aligned(time: NaiveTime) -> bool {
    time.second() == 0 && time.nanosecond() == 0 && time.minute() % SLOT_INTERVAL_MINUTES == 0
}

pub fn validate_window(work_start: NaiveTime, work_end: NaiveTime) -> Result<(), AvailabilityError> {
    if work_start >= work_end {
        return Err(AvailabilityError::InvalidWindow(format!(
            "work_start {} must be before work_end {}",
            format_slot_time(&work_start),
            format_slot_time(&work_end)
        )));
    }
    Ok(())
}

/// Every grid instant in the half-open window `[work_start, work_end)`,
/// ascending. An unaligned `work_start` contributes from the next aligned
/// instant.
pub fn full_grid(work_start: NaiveTime, work_end: NaiveTime) -> Vec<NaiveTime> {
    let end = minutes_of(work_end);
    let mut cursor = align_up(minutes_of(work_start));
    let mut grid = Vec::new();
    while cursor < end {
        grid.push(time_from_minutes(cursor));
        cursor += SLOT_INTERVAL_MINUTES;
    }
    grid
}

/// Grid instants a booking of `duration_minutes` starting at `start` holds:
/// every aligned `t` with `start <= t < start + duration`. A duration that
/// is not a multiple of the interval still claims its partial trailing slot;
/// a range running past midnight is clamped at end of day.
pub fn occupied_range(start: NaiveTime, duration_minutes: u32) -> Vec<NaiveTime> {
    let begin = minutes_of(start);
    let end = (begin + duration_minutes).min(MINUTES_PER_DAY);
    let mut cursor = align_up(begin);
    let mut range = Vec::new();
    while cursor < end {
        range.push(time_from_minutes(cursor));
        cursor += SLOT_INTERVAL_MINUTES;
    }
    range
}

/// Booked instants are whatever the working-window grid holds that the
/// available list does not. There is no stored booked list to drift out of
/// sync; this reconstruction is the authoritative one.
pub fn booked_slots(slot_set: &SlotSet) -> Vec<NaiveTime> {
    full_grid(slot_set.work_start, slot_set.work_end)
        .into_iter()
        .filter(|slot| !slot_set.available_slots.contains(slot))
        .collect()
}

/// Subtract `range` from the available list, but only if every instant in it
/// is currently available. On failure the slot set is left untouched.
pub fn consume_range(slot_set: &mut SlotSet, range: &[NaiveTime]) -> bool {
    if !range.iter().all(|slot| slot_set.available_slots.contains(slot)) {
        return false;
    }
    slot_set.available_slots.retain(|slot| !range.contains(slot));
    true
}

/// Union `range` back into the available list. Instants outside the current
/// working window or off the grid are dropped, not errors; the window may
/// have changed since the range was consumed.
pub fn restore_range(slot_set: &mut SlotSet, range: &[NaiveTime]) {
    for slot in range {
        let in_window = *slot >= slot_set.work_start && *slot < slot_set.work_end;
        if in_window && is_aligned(*slot) && !slot_set.available_slots.contains(slot) {
            slot_set.available_slots.push(*slot);
        }
    }
    slot_set.available_slots.sort();
    slot_set.available_slots.dedup();
}

/// Re-declare the working window for one doctor-date while keeping every
/// already-booked instant booked. With no existing slot set the new window
/// opens fully available. Booked instants that fall outside the new window
/// leave the grid entirely.
pub fn merge_window(
    existing: Option<&SlotSet>,
    doctor_id: &str,
    date: NaiveDate,
    work_start: NaiveTime,
    work_end: NaiveTime,
) -> SlotSet {
    let booked = existing.map(booked_slots).unwrap_or_default();
    let available_slots = full_grid(work_start, work_end)
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .collect();

    SlotSet {
        doctor_id: doctor_id.to_string(),
        date,
        work_start,
        work_end,
        available_slots,
        updated_at: Utc::now(),
    }
}
