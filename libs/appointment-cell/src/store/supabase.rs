use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{Appointment, AppointmentStatus, StoreError};
use crate::store::AppointmentStore;

const APPOINTMENTS_TABLE: &str = "/rest/v1/appointments";

/// PostgREST-backed appointment store.
///
/// The table is expected to carry an exclusion constraint over
/// `(doctor_id, tstzrange(scheduled_start, scheduled_end, '[)'))` for rows whose
/// status is not `cancelled`; a violation comes back as HTTP 409.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn store_error(e: DatabaseError) -> StoreError {
    if e.is_conflict() {
        StoreError::Conflict
    } else {
        StoreError::Backend(e.to_string())
    }
}

fn encode(appointment: &Appointment) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(appointment).map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_TABLE, appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)?;

        rows.into_iter().next().ok_or(StoreError::NotFound(appointment_id))
    }

    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&status=neq.{}&scheduled_start=lt.{}&scheduled_end=gt.{}&order=scheduled_start.asc",
            APPOINTMENTS_TABLE,
            doctor_id,
            AppointmentStatus::Cancelled,
            timestamp(end),
            timestamp(start)
        );
        self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&scheduled_start=gte.{}&scheduled_start=lt.{}&order=scheduled_start.asc,created_at.asc",
            APPOINTMENTS_TABLE,
            doctor_id,
            timestamp(from),
            timestamp(to)
        );
        self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        debug!("Persisting appointment {} for doctor {}", appointment.id, appointment.doctor_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_representation(Method::POST, APPOINTMENTS_TABLE, None, Some(encode(&appointment)?))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    warn!("Exclusion constraint rejected appointment {}", appointment.id);
                }
                store_error(e)
            })?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no appointment".to_string()))
    }

    async fn update(
        &self,
        appointment: Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let path = format!(
            "{}?id=eq.{}&status=eq.{}",
            APPOINTMENTS_TABLE, appointment.id, expected_status
        );
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_representation(Method::PATCH, &path, None, Some(encode(&appointment)?))
            .await
            .map_err(store_error)?;

        match rows.into_iter().next() {
            Some(updated) => Ok(updated),
            None => {
                // Nothing matched: either the row is gone or its status moved on
                self.get(appointment.id).await?;
                Err(StoreError::StaleWrite(appointment.id))
            }
        }
    }

    async fn discard(&self, appointment_id: Uuid) -> Result<(), StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_TABLE, appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_representation(Method::DELETE, &path, None, None)
            .await
            .map_err(store_error)?;

        if rows.is_empty() {
            return Err(StoreError::NotFound(appointment_id));
        }
        Ok(())
    }
}
