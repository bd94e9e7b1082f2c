use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentEvent, AppointmentStatus, BookSlotRequest, RescheduleAppointmentRequest,
    SchedulingError, RESCHEDULED_REASON,
};
use crate::services::booking::BookingCoordinator;
use crate::services::events::AppointmentEventPublisher;
use crate::services::lifecycle::{AppointmentLifecycleService, Transition};
use crate::store::AppointmentStore;

/// Moves an appointment to a new window as one unit of work: book the new
/// window, carry over confirmation, cancel the old one. Any failure after the
/// new row exists discards it again, so callers see either both changes or none.
pub struct RescheduleService {
    coordinator: Arc<BookingCoordinator>,
    lifecycle: Arc<AppointmentLifecycleService>,
    appointments: Arc<dyn AppointmentStore>,
    events: Arc<dyn AppointmentEventPublisher>,
}

impl RescheduleService {
    pub fn new(
        coordinator: Arc<BookingCoordinator>,
        lifecycle: Arc<AppointmentLifecycleService>,
        appointments: Arc<dyn AppointmentStore>,
        events: Arc<dyn AppointmentEventPublisher>,
    ) -> Self {
        Self {
            coordinator,
            lifecycle,
            appointments,
            events,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.appointments.get(appointment_id).await?;
        ensure_reschedulable(&current)?;

        let booking = BookSlotRequest {
            patient_id: current.patient_id,
            doctor_id: current.doctor_id,
            start_time: request.new_start_time,
            end_time: request.new_end_time,
            consultation_type: current.consultation_type,
        };
        let offering = self.coordinator.validate_request(&booking).await?;

        let guard = self.coordinator.lock(current.doctor_id).await?;

        // Status may have moved while we waited for the lock
        let current = self.appointments.get(appointment_id).await?;
        ensure_reschedulable(&current)?;

        let reserved = self
            .coordinator
            .reserve_locked(&guard, &booking, &offering, Some(current.id))
            .await?;

        let outcome = self.finish(&current, &reserved).await;

        match outcome {
            Ok((replacement, cancelled)) => {
                drop(guard);
                info!(
                    "Appointment {} rescheduled to {} at {}",
                    cancelled.id, replacement.id, replacement.scheduled_start
                );
                // Successor events precede the predecessor's cancellation
                self.events.publish(AppointmentEvent::BookingCreated(reserved));
                if replacement.status == AppointmentStatus::Confirmed {
                    self.lifecycle.publish(&Transition::Confirm, replacement.clone());
                }
                self.lifecycle.publish(
                    &Transition::Cancel {
                        reason: RESCHEDULED_REASON.to_string(),
                    },
                    cancelled,
                );
                Ok(replacement)
            }
            Err(e) => {
                warn!("Rescheduling {} failed after reserving {}: {}", current.id, reserved.id, e);
                if let Err(rollback) = self.appointments.discard(reserved.id).await {
                    error!(
                        "Failed to discard replacement {} for appointment {}: {}",
                        reserved.id, current.id, rollback
                    );
                    return Err(SchedulingError::Store(format!(
                        "reschedule of {} failed ({}) and replacement {} could not be rolled back: {}",
                        current.id, e, reserved.id, rollback
                    )));
                }
                Err(e)
            }
        }
    }

    async fn finish(
        &self,
        current: &Appointment,
        replacement: &Appointment,
    ) -> Result<(Appointment, Appointment), SchedulingError> {
        let replacement = if current.status == AppointmentStatus::Confirmed {
            self.lifecycle
                .apply(replacement, &Transition::Confirm)
                .await?
                .ok_or_else(|| concurrently_modified(replacement.id))?
        } else {
            replacement.clone()
        };

        let cancel = Transition::Cancel {
            reason: RESCHEDULED_REASON.to_string(),
        };
        let cancelled = self
            .lifecycle
            .apply(current, &cancel)
            .await?
            .ok_or_else(|| concurrently_modified(current.id))?;

        Ok((replacement, cancelled))
    }
}

fn ensure_reschedulable(appointment: &Appointment) -> Result<(), SchedulingError> {
    if appointment.status.is_terminal() {
        return Err(SchedulingError::InvalidState {
            current: appointment.status,
            action: "reschedule",
        });
    }
    Ok(())
}

fn concurrently_modified(appointment_id: Uuid) -> SchedulingError {
    SchedulingError::Conflict(format!("appointment {} was modified concurrently", appointment_id))
}
