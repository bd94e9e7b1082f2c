// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::models::{day_of_week_index, ConsultationOffering};
use doctor_cell::store::{AvailabilityStore, OfferingStore};

use crate::clock::Clock;
use crate::intervals::Interval;
use crate::models::{Appointment, AppointmentEvent, AppointmentStatus, BookSlotRequest, SchedulingError};
use crate::services::events::AppointmentEventPublisher;
use crate::services::locks::{DoctorLockGuard, DoctorLockRegistry};
use crate::services::slots::{day_bounds, open_intervals};
use crate::store::AppointmentStore;

/// Owns the per-doctor critical section: the only path that creates
/// appointment rows.
pub struct BookingCoordinator {
    appointments: Arc<dyn AppointmentStore>,
    availability: Arc<dyn AvailabilityStore>,
    offerings: Arc<dyn OfferingStore>,
    locks: DoctorLockRegistry,
    events: Arc<dyn AppointmentEventPublisher>,
    clock: Arc<dyn Clock>,
    lock_wait: Duration,
}

impl BookingCoordinator {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        availability: Arc<dyn AvailabilityStore>,
        offerings: Arc<dyn OfferingStore>,
        events: Arc<dyn AppointmentEventPublisher>,
        clock: Arc<dyn Clock>,
        lock_wait: Duration,
    ) -> Self {
        Self {
            appointments,
            availability,
            offerings,
            locks: DoctorLockRegistry::new(),
            events,
            clock,
            lock_wait,
        }
    }

    /// Reserve a slot. The new appointment starts out `Pending`.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, patient_id = %request.patient_id))]
    pub async fn book(&self, request: BookSlotRequest) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking {} for patient {} with doctor {} at {}",
            request.consultation_type, request.patient_id, request.doctor_id, request.start_time
        );

        let offering = self.validate_request(&request).await?;

        let guard = self.lock(request.doctor_id).await?;
        let appointment = self.reserve_locked(&guard, &request, &offering, None).await?;
        drop(guard);

        self.events.publish(AppointmentEvent::BookingCreated(appointment.clone()));
        Ok(appointment)
    }

    pub(crate) async fn lock(&self, doctor_id: Uuid) -> Result<DoctorLockGuard, SchedulingError> {
        self.locks.acquire(doctor_id, self.lock_wait).await
    }

    /// Checks that need no lock: shape, offering, past time and availability.
    pub(crate) async fn validate_request(
        &self,
        request: &BookSlotRequest,
    ) -> Result<ConsultationOffering, SchedulingError> {
        let requested = Interval::new(request.start_time, request.end_time).ok_or_else(|| {
            SchedulingError::Validation("Start time must be before end time".to_string())
        })?;

        let offering = self
            .offerings
            .get_offering(request.doctor_id, request.consultation_type)
            .await?
            .ok_or(SchedulingError::UnknownOffering {
                doctor_id: request.doctor_id,
                consultation_type: request.consultation_type,
            })?;

        if request.end_time - request.start_time != offering.session_duration() {
            return Err(SchedulingError::Validation(format!(
                "{} sessions last {} minutes",
                request.consultation_type, offering.session_duration_minutes
            )));
        }

        if request.start_time <= self.clock.now() {
            return Err(SchedulingError::Validation(
                "Appointment must start in the future".to_string(),
            ));
        }

        let date = request.start_time.date_naive();
        let day = day_bounds(date);
        let windows = self
            .availability
            .get_recurring_windows(request.doctor_id, day_of_week_index(date))
            .await?;
        let overrides = self
            .availability
            .get_overrides(request.doctor_id, day.start, day.end)
            .await?;

        if !open_intervals(date, &windows, &overrides).covers(&requested) {
            debug!("Requested window {} - {} is outside availability", request.start_time, request.end_time);
            return Err(SchedulingError::Validation(
                "Requested time is outside the doctor's availability".to_string(),
            ));
        }

        Ok(offering)
    }

    /// Conflict re-check and insert. Caller must hold the doctor's lock.
    /// `replacing` is the appointment being rescheduled: it does not count as
    /// a conflict and becomes the new row's predecessor.
    pub(crate) async fn reserve_locked(
        &self,
        guard: &DoctorLockGuard,
        request: &BookSlotRequest,
        offering: &ConsultationOffering,
        replacing: Option<Uuid>,
    ) -> Result<Appointment, SchedulingError> {
        debug_assert_eq!(guard.doctor_id(), request.doctor_id);

        let overlapping = self
            .appointments
            .find_overlapping(request.doctor_id, request.start_time, request.end_time)
            .await?;

        if let Some(existing) = overlapping.iter().find(|a| Some(a.id) != replacing) {
            warn!(
                "Slot {} - {} for doctor {} already taken by appointment {}",
                request.start_time, request.end_time, request.doctor_id, existing.id
            );
            return Err(SchedulingError::slot_unavailable());
        }

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            scheduled_start: request.start_time,
            scheduled_end: request.end_time,
            consultation_type: request.consultation_type,
            fee: offering.fee_amount,
            duration_minutes: offering.session_duration_minutes,
            status: AppointmentStatus::Pending,
            previous_appointment_id: replacing,
            cancellation_reason: None,
            cancelled_at: None,
            actual_start: None,
            actual_end: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.appointments.insert(appointment).await?;
        info!(
            "Appointment {} booked for doctor {} at {} ({:.2})",
            stored.id, stored.doctor_id, stored.scheduled_start, stored.fee
        );
        Ok(stored)
    }
}
