// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{Appointment, AppointmentEvent, AppointmentStatus, SchedulingError, StoreError};
use crate::services::events::AppointmentEventPublisher;
use crate::store::AppointmentStore;

/// Lost compare-and-set races are retried against a fresh read this many times.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Confirm,
    Cancel {
        reason: String,
    },
    Complete {
        actual_start: Option<DateTime<Utc>>,
        actual_end: Option<DateTime<Utc>>,
    },
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::Confirm => AppointmentStatus::Confirmed,
            Transition::Cancel { .. } => AppointmentStatus::Cancelled,
            Transition::Complete { .. } => AppointmentStatus::Completed,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::Cancel { .. } => "cancel",
            Transition::Complete { .. } => "complete",
        }
    }

    fn event(&self, appointment: Appointment) -> AppointmentEvent {
        match self {
            Transition::Confirm => AppointmentEvent::BookingConfirmed(appointment),
            Transition::Cancel { .. } => AppointmentEvent::BookingCancelled(appointment),
            Transition::Complete { .. } => AppointmentEvent::BookingCompleted(appointment),
        }
    }
}

enum Plan {
    /// Nothing to write; the record already reflects the request.
    Unchanged(Appointment),
    Write(Appointment),
}

pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
    events: Arc<dyn AppointmentEventPublisher>,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycleService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        events: Arc<dyn AppointmentEventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            events,
            clock,
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        transition: &Transition,
    ) -> Result<(), SchedulingError> {
        let new_status = transition.target();
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(SchedulingError::InvalidState {
                current: current_status,
                action: transition.action(),
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    #[instrument(skip(self))]
    pub async fn confirm(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.run(appointment_id, Transition::Confirm).await
    }

    /// Cancelling an already cancelled appointment returns it unchanged.
    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: Uuid, reason: &str) -> Result<Appointment, SchedulingError> {
        self.run(
            appointment_id,
            Transition::Cancel {
                reason: reason.to_string(),
            },
        )
        .await
    }

    /// Actual times default to the scheduled window.
    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        actual_start: Option<DateTime<Utc>>,
        actual_end: Option<DateTime<Utc>>,
    ) -> Result<Appointment, SchedulingError> {
        self.run(
            appointment_id,
            Transition::Complete {
                actual_start,
                actual_end,
            },
        )
        .await
    }

    async fn run(&self, appointment_id: Uuid, transition: Transition) -> Result<Appointment, SchedulingError> {
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let current = self.appointments.get(appointment_id).await?;

            let next = match self.plan(&current, &transition)? {
                Plan::Unchanged(appointment) => {
                    debug!("Appointment {} already {}", appointment_id, appointment.status);
                    return Ok(appointment);
                }
                Plan::Write(next) => next,
            };

            match self.write(next, current.status).await? {
                Some(updated) => {
                    info!("Appointment {} moved {} -> {}", appointment_id, current.status, updated.status);
                    self.events.publish(transition.event(updated.clone()));
                    return Ok(updated);
                }
                None => debug!(
                    "Appointment {} changed during {} (attempt {}), re-reading",
                    appointment_id,
                    transition.action(),
                    attempt
                ),
            }
        }

        warn!("Giving up on {} for appointment {} after repeated concurrent updates", transition.action(), appointment_id);
        Err(SchedulingError::Conflict(format!(
            "appointment {} was modified concurrently",
            appointment_id
        )))
    }

    /// One compare-and-set attempt against an already loaded record, without
    /// publishing. `Ok(None)` means the record changed since it was loaded.
    pub(crate) async fn apply(
        &self,
        current: &Appointment,
        transition: &Transition,
    ) -> Result<Option<Appointment>, SchedulingError> {
        match self.plan(current, transition)? {
            Plan::Unchanged(appointment) => Ok(Some(appointment)),
            Plan::Write(next) => self.write(next, current.status).await,
        }
    }

    pub(crate) fn publish(&self, transition: &Transition, appointment: Appointment) {
        self.events.publish(transition.event(appointment));
    }

    fn plan(&self, current: &Appointment, transition: &Transition) -> Result<Plan, SchedulingError> {
        if matches!(transition, Transition::Cancel { .. }) && current.status == AppointmentStatus::Cancelled {
            return Ok(Plan::Unchanged(current.clone()));
        }

        self.validate_status_transition(current.status, transition)?;

        let now = self.clock.now();
        let mut next = current.clone();
        next.status = transition.target();
        next.updated_at = now;

        match transition {
            Transition::Confirm => {}
            Transition::Cancel { reason } => {
                next.cancellation_reason = Some(reason.clone());
                next.cancelled_at = Some(now);
            }
            Transition::Complete {
                actual_start,
                actual_end,
            } => {
                let start = actual_start.unwrap_or(current.scheduled_start);
                let end = actual_end.unwrap_or(current.scheduled_end);
                if start >= end {
                    return Err(SchedulingError::Validation(
                        "Actual start must be before actual end".to_string(),
                    ));
                }
                next.actual_start = Some(start);
                next.actual_end = Some(end);
            }
        }

        Ok(Plan::Write(next))
    }

    async fn write(
        &self,
        next: Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<Option<Appointment>, SchedulingError> {
        match self.appointments.update(next, expected_status).await {
            Ok(updated) => Ok(Some(updated)),
            Err(StoreError::StaleWrite(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
