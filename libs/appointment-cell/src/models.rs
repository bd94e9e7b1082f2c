// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

use doctor_cell::models::AvailabilityError;
pub use doctor_cell::models::ConsultationType;

/// Cancellation reason written on the predecessor of a reschedule.
pub const RESCHEDULED_REASON: &str = "Rescheduled";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub consultation_type: ConsultationType,
    /// Snapshot of the offering's fee at booking time.
    pub fee: f64,
    /// Snapshot of the offering's session length at booking time.
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub previous_appointment_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Cancelled appointments no longer hold their window.
    pub fn holds_window(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    /// Half-open overlap with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.scheduled_start < end && start < self.scheduled_end
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A bookable window derived from availability minus conflicts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub doctor_id: Uuid,
    pub consultation_type: ConsultationType,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub consultation_type: ConsultationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
    pub new_end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub consultation_type: ConsultationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRangeQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

// ==============================================================================
// OUTBOUND EVENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "appointment", rename_all = "snake_case")]
pub enum AppointmentEvent {
    BookingCreated(Appointment),
    BookingConfirmed(Appointment),
    BookingCancelled(Appointment),
    BookingCompleted(Appointment),
}

impl AppointmentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppointmentEvent::BookingCreated(_) => "booking_created",
            AppointmentEvent::BookingConfirmed(_) => "booking_confirmed",
            AppointmentEvent::BookingCancelled(_) => "booking_cancelled",
            AppointmentEvent::BookingCompleted(_) => "booking_completed",
        }
    }

    pub fn appointment(&self) -> &Appointment {
        match self {
            AppointmentEvent::BookingCreated(a)
            | AppointmentEvent::BookingConfirmed(a)
            | AppointmentEvent::BookingCancelled(a)
            | AppointmentEvent::BookingCompleted(a) => a,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Write rejected by a conflicting booking")]
    Conflict,

    #[error("Appointment {0} changed since it was read")]
    StaleWrite(Uuid),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Doctor {doctor_id} does not offer {consultation_type}")]
    UnknownOffering {
        doctor_id: Uuid,
        consultation_type: ConsultationType,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot {action} an appointment that is {current}")]
    InvalidState {
        current: AppointmentStatus,
        action: &'static str,
    },

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Schedule for doctor {doctor_id} is busy (waited {waited_ms} ms)")]
    Busy { doctor_id: Uuid, waited_ms: u64 },

    #[error("Store error: {0}")]
    Store(String),
}

impl SchedulingError {
    pub fn slot_unavailable() -> Self {
        SchedulingError::Conflict("slot no longer available".to_string())
    }

    /// Busy and backend hiccups may succeed on a later attempt; nothing else will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::Busy { .. } | SchedulingError::Store(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SchedulingError::Validation(_) | SchedulingError::UnknownOffering { .. }
        )
    }
}

impl From<StoreError> for SchedulingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SchedulingError::NotFound(id),
            StoreError::Conflict => SchedulingError::slot_unavailable(),
            StoreError::StaleWrite(id) => {
                SchedulingError::Conflict(format!("appointment {} was modified concurrently", id))
            }
            StoreError::Backend(msg) => SchedulingError::Store(msg),
        }
    }
}

impl From<AvailabilityError> for SchedulingError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::Store(msg) => SchedulingError::Store(msg),
            other => SchedulingError::Validation(other.to_string()),
        }
    }
}
