//! Appointment persistence seam.
//!
//! The booking coordinator is the only writer that inserts rows; lifecycle
//! transitions go through `update`, which is a compare-and-set on status.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, StoreError};

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, StoreError>;

    /// Non-cancelled appointments of the doctor intersecting `[start, end)`.
    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Every appointment of the doctor starting in `[from, to)`, any status,
    /// ordered by scheduled start.
    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    /// Replace the stored record only if its status is still `expected_status`.
    /// Fails with `StaleWrite` otherwise.
    async fn update(
        &self,
        appointment: Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<Appointment, StoreError>;

    /// Hard delete. Reserved for rolling back a reservation that never became visible
    /// to a caller.
    async fn discard(&self, appointment_id: Uuid) -> Result<(), StoreError>;
}
