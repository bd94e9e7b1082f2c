//! Storage seams for doctor availability and consultation offerings.
//!
//! Services receive these as `Arc<dyn ...>` at construction so tests can swap
//! the Supabase-backed stores for the in-memory ones.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AvailabilityError, AvailabilityOverride, ConsultationOffering, ConsultationType,
    RecurringAvailability,
};

pub use memory::InMemoryAvailabilityStore;
pub use supabase::SupabaseAvailabilityStore;

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Active windows for one weekday, ordered by start time.
    async fn get_recurring_windows(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<RecurringAvailability>, AvailabilityError>;

    /// Every active window of the doctor, ordered by day then start time.
    async fn list_windows(&self, doctor_id: Uuid) -> Result<Vec<RecurringAvailability>, AvailabilityError>;

    /// Must reject an exact duplicate of an active window with `DuplicateWindow`.
    async fn insert_window(&self, window: RecurringAvailability) -> Result<RecurringAvailability, AvailabilityError>;

    async fn soft_delete_window(
        &self,
        window_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<RecurringAvailability, AvailabilityError>;

    /// Overrides intersecting `[from, to)`, ordered by start time.
    async fn get_overrides(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AvailabilityOverride>, AvailabilityError>;

    async fn insert_override(&self, entry: AvailabilityOverride) -> Result<AvailabilityOverride, AvailabilityError>;

    async fn delete_override(&self, override_id: Uuid) -> Result<AvailabilityOverride, AvailabilityError>;
}

/// Read side of the pricing collaborator plus the doctor's own writes.
#[async_trait]
pub trait OfferingStore: Send + Sync {
    async fn get_offering(
        &self,
        doctor_id: Uuid,
        consultation_type: ConsultationType,
    ) -> Result<Option<ConsultationOffering>, AvailabilityError>;

    async fn upsert_offering(&self, offering: ConsultationOffering) -> Result<ConsultationOffering, AvailabilityError>;
}
