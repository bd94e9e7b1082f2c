use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use std::fmt;

// ==============================================================================
// RECURRING AVAILABILITY
// ==============================================================================

/// A weekly window in which the doctor sees patients. Times are UTC wall-clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RecurringAvailability {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Same doctor, day and exact bounds.
    pub fn duplicates(&self, other: &RecurringAvailability) -> bool {
        self.doctor_id == other.doctor_id
            && self.day_of_week == other.day_of_week
            && self.start_time == other.start_time
            && self.end_time == other.end_time
    }
}

/// Sunday-based index used by `day_of_week`.
pub fn day_of_week_index(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

// ==============================================================================
// OVERRIDES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    /// Removes availability inside the window (holiday, half day).
    Blocked,
    /// Adds availability outside the weekly pattern (extra clinic).
    ExtraOpen,
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideKind::Blocked => write!(f, "blocked"),
            OverrideKind::ExtraOpen => write!(f, "extra_open"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityOverride {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub kind: OverrideKind,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AvailabilityOverride {
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start_time < to && from < self.end_time
    }
}

// ==============================================================================
// CONSULTATION OFFERINGS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum ConsultationType {
    #[serde(alias = "general_consultation", alias = "consultation", alias = "general")]
    GeneralConsultation,

    #[serde(alias = "initial_consultation", alias = "initial", alias = "new_patient")]
    InitialConsultation,

    #[serde(alias = "follow_up_consultation", alias = "follow_up", alias = "followup")]
    FollowUpConsultation,

    #[serde(alias = "emergency_consultation", alias = "emergency", alias = "urgent")]
    EmergencyConsultation,

    #[serde(alias = "prescription_renewal", alias = "prescription")]
    PrescriptionRenewal,

    #[serde(alias = "specialty_consultation", alias = "specialist")]
    SpecialtyConsultation,

    #[serde(alias = "telehealth_checkin", alias = "telehealth", alias = "virtual")]
    TelehealthCheckIn,

    #[serde(alias = "mental_health", alias = "psychology", alias = "psychiatry")]
    MentalHealth,

    #[serde(alias = "womens_health", alias = "gynecology", alias = "obstetrics")]
    WomensHealth,
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationType::GeneralConsultation => write!(f, "GeneralConsultation"),
            ConsultationType::InitialConsultation => write!(f, "InitialConsultation"),
            ConsultationType::FollowUpConsultation => write!(f, "FollowUpConsultation"),
            ConsultationType::EmergencyConsultation => write!(f, "EmergencyConsultation"),
            ConsultationType::PrescriptionRenewal => write!(f, "PrescriptionRenewal"),
            ConsultationType::SpecialtyConsultation => write!(f, "SpecialtyConsultation"),
            ConsultationType::TelehealthCheckIn => write!(f, "TelehealthCheckIn"),
            ConsultationType::MentalHealth => write!(f, "MentalHealth"),
            ConsultationType::WomensHealth => write!(f, "WomensHealth"),
        }
    }
}

/// Fee and session length a doctor charges for one consultation type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationOffering {
    pub doctor_id: Uuid,
    pub consultation_type: ConsultationType,
    pub fee_amount: f64,
    pub session_duration_minutes: i64,
    pub updated_at: DateTime<Utc>,
}

impl ConsultationOffering {
    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_duration_minutes)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityOverrideRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub kind: OverrideKind,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertOfferingRequest {
    pub consultation_type: ConsultationType,
    pub fee_amount: f64,
    pub session_duration_minutes: i64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("An identical availability window already exists for this day")]
    DuplicateWindow,

    #[error("Availability record not found: {0}")]
    NotFound(Uuid),

    #[error("Availability store error: {0}")]
    Store(String),
}
