use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, StoreError};
use crate::store::AppointmentStore;

/// Process-local appointment store used by tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, StoreError> {
        self.appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(StoreError::NotFound(appointment_id))
    }

    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.holds_window() && a.overlaps(start, end))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.scheduled_start);
        Ok(found)
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.scheduled_start >= from && a.scheduled_start < to)
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.scheduled_start, a.created_at));
        Ok(found)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(StoreError::Backend(format!(
                "Appointment {} already exists",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(
        &self,
        appointment: Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        let current = appointments
            .get_mut(&appointment.id)
            .ok_or(StoreError::NotFound(appointment.id))?;

        if current.status != expected_status {
            return Err(StoreError::StaleWrite(appointment.id));
        }

        *current = appointment.clone();
        Ok(appointment)
    }

    async fn discard(&self, appointment_id: Uuid) -> Result<(), StoreError> {
        self.appointments
            .write()
            .await
            .remove(&appointment_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(appointment_id))
    }
}
