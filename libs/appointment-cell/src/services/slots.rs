use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use doctor_cell::models::{day_of_week_index, AvailabilityOverride, OverrideKind, RecurringAvailability};
use doctor_cell::store::{AvailabilityStore, OfferingStore};

use crate::clock::Clock;
use crate::intervals::{Interval, IntervalSet};
use crate::models::{Appointment, ConsultationType, SchedulingError, Slot};
use crate::store::AppointmentStore;

pub type TimeInterval = Interval<DateTime<Utc>>;
pub type TimeIntervalSet = IntervalSet<DateTime<Utc>>;

// ==============================================================================
// PURE SLOT ALGEBRA
// ==============================================================================

/// `[date 00:00, date+1 00:00)` in UTC.
pub fn day_bounds(date: NaiveDate) -> TimeInterval {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Interval {
        start,
        end: start + Duration::days(1),
    }
}

/// Open time for one day: weekly windows plus extra openings, minus blocks.
///
/// A block always wins over an extra opening covering the same time, and a
/// block spanning the whole day leaves nothing.
pub fn open_intervals(
    date: NaiveDate,
    windows: &[RecurringAvailability],
    overrides: &[AvailabilityOverride],
) -> TimeIntervalSet {
    let day = day_bounds(date);
    let weekday = day_of_week_index(date);

    let weekly = windows
        .iter()
        .filter(|w| w.is_active() && w.day_of_week == weekday)
        .filter_map(|w| Interval::new(date.and_time(w.start_time).and_utc(), date.and_time(w.end_time).and_utc()));

    let extra = overrides
        .iter()
        .filter(|o| o.kind == OverrideKind::ExtraOpen)
        .filter_map(|o| Interval::new(o.start_time, o.end_time));

    let mut open = IntervalSet::from_intervals(weekly.chain(extra));
    open.clip(day);

    for block in overrides.iter().filter(|o| o.kind == OverrideKind::Blocked) {
        if let Some(block) = Interval::new(block.start_time, block.end_time) {
            open.subtract(block);
        }
    }

    open
}

/// Walk the free time in fixed steps of `duration`. Partial remainders are
/// dropped and nothing starting at or before `now` is offered.
#[allow(clippy::too_many_arguments)]
pub fn compute_slots(
    doctor_id: Uuid,
    consultation_type: ConsultationType,
    date: NaiveDate,
    duration: Duration,
    windows: &[RecurringAvailability],
    overrides: &[AvailabilityOverride],
    bookings: &[Appointment],
    now: DateTime<Utc>,
) -> Vec<Slot> {
    if duration <= Duration::zero() || date < now.date_naive() {
        return Vec::new();
    }

    let mut free = open_intervals(date, windows, overrides);
    for booking in bookings.iter().filter(|b| b.holds_window()) {
        if let Some(taken) = Interval::new(booking.scheduled_start, booking.scheduled_end) {
            free.subtract(taken);
        }
    }

    let mut slots = Vec::new();
    for interval in free.iter() {
        let mut cursor = interval.start;
        while cursor + duration <= interval.end {
            if cursor > now {
                slots.push(Slot {
                    start_time: cursor,
                    end_time: cursor + duration,
                    doctor_id,
                    consultation_type,
                });
            }
            cursor += duration;
        }
    }

    slots
}

// ==============================================================================
// SLOT COMPUTER
// ==============================================================================

pub struct SlotComputer {
    availability: Arc<dyn AvailabilityStore>,
    offerings: Arc<dyn OfferingStore>,
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
}

impl SlotComputer {
    pub fn new(
        availability: Arc<dyn AvailabilityStore>,
        offerings: Arc<dyn OfferingStore>,
        appointments: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            availability,
            offerings,
            appointments,
            clock,
        }
    }

    /// Bookable slots for one doctor, date and consultation type, ascending.
    #[instrument(skip(self))]
    pub async fn list_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        consultation_type: ConsultationType,
    ) -> Result<Vec<Slot>, SchedulingError> {
        let offering = self
            .offerings
            .get_offering(doctor_id, consultation_type)
            .await?
            .ok_or(SchedulingError::UnknownOffering {
                doctor_id,
                consultation_type,
            })?;

        let now = self.clock.now();
        if date < now.date_naive() {
            debug!("Date {} is in the past, no slots", date);
            return Ok(Vec::new());
        }

        let day = day_bounds(date);
        let windows = self
            .availability
            .get_recurring_windows(doctor_id, day_of_week_index(date))
            .await?;
        let overrides = self.availability.get_overrides(doctor_id, day.start, day.end).await?;
        let bookings = self.appointments.find_overlapping(doctor_id, day.start, day.end).await?;

        let slots = compute_slots(
            doctor_id,
            consultation_type,
            date,
            offering.session_duration(),
            &windows,
            &overrides,
            &bookings,
            now,
        );

        debug!(
            "Computed {} slots from {} windows, {} overrides and {} bookings",
            slots.len(),
            windows.len(),
            overrides.len(),
            bookings.len()
        );
        Ok(slots)
    }
}
