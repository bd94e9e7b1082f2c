use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    AvailabilityError, AvailabilityOverride, ConsultationOffering, ConsultationType,
    RecurringAvailability,
};
use crate::store::{AvailabilityStore, OfferingStore};

#[derive(Default)]
struct AvailabilityState {
    windows: HashMap<Uuid, RecurringAvailability>,
    overrides: HashMap<Uuid, AvailabilityOverride>,
    offerings: HashMap<(Uuid, ConsultationType), ConsultationOffering>,
}

/// Process-local availability store used by tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    state: RwLock<AvailabilityState>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn get_recurring_windows(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<RecurringAvailability>, AvailabilityError> {
        let state = self.state.read().await;
        let mut windows: Vec<RecurringAvailability> = state
            .windows
            .values()
            .filter(|w| w.doctor_id == doctor_id && w.day_of_week == day_of_week && w.is_active())
            .cloned()
            .collect();
        windows.sort_by_key(|w| (w.start_time, w.end_time));
        Ok(windows)
    }

    async fn list_windows(&self, doctor_id: Uuid) -> Result<Vec<RecurringAvailability>, AvailabilityError> {
        let state = self.state.read().await;
        let mut windows: Vec<RecurringAvailability> = state
            .windows
            .values()
            .filter(|w| w.doctor_id == doctor_id && w.is_active())
            .cloned()
            .collect();
        windows.sort_by_key(|w| (w.day_of_week, w.start_time, w.end_time));
        Ok(windows)
    }

    async fn insert_window(&self, window: RecurringAvailability) -> Result<RecurringAvailability, AvailabilityError> {
        let mut state = self.state.write().await;
        if state.windows.values().any(|w| w.is_active() && w.duplicates(&window)) {
            return Err(AvailabilityError::DuplicateWindow);
        }
        state.windows.insert(window.id, window.clone());
        Ok(window)
    }

    async fn soft_delete_window(
        &self,
        window_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<RecurringAvailability, AvailabilityError> {
        let mut state = self.state.write().await;
        let window = state
            .windows
            .get_mut(&window_id)
            .filter(|w| w.is_active())
            .ok_or(AvailabilityError::NotFound(window_id))?;
        window.deleted_at = Some(deleted_at);
        Ok(window.clone())
    }

    async fn get_overrides(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AvailabilityOverride>, AvailabilityError> {
        let state = self.state.read().await;
        let mut overrides: Vec<AvailabilityOverride> = state
            .overrides
            .values()
            .filter(|o| o.doctor_id == doctor_id && o.overlaps(from, to))
            .cloned()
            .collect();
        overrides.sort_by_key(|o| (o.start_time, o.end_time));
        Ok(overrides)
    }

    async fn insert_override(&self, entry: AvailabilityOverride) -> Result<AvailabilityOverride, AvailabilityError> {
        let mut state = self.state.write().await;
        state.overrides.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn delete_override(&self, override_id: Uuid) -> Result<AvailabilityOverride, AvailabilityError> {
        let mut state = self.state.write().await;
        state
            .overrides
            .remove(&override_id)
            .ok_or(AvailabilityError::NotFound(override_id))
    }
}

#[async_trait]
impl OfferingStore for InMemoryAvailabilityStore {
    async fn get_offering(
        &self,
        doctor_id: Uuid,
        consultation_type: ConsultationType,
    ) -> Result<Option<ConsultationOffering>, AvailabilityError> {
        let state = self.state.read().await;
        Ok(state.offerings.get(&(doctor_id, consultation_type)).cloned())
    }

    async fn upsert_offering(&self, offering: ConsultationOffering) -> Result<ConsultationOffering, AvailabilityError> {
        let mut state = self.state.write().await;
        state
            .offerings
            .insert((offering.doctor_id, offering.consultation_type), offering.clone());
        Ok(offering)
    }
}
