use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{
    AvailabilityError, AvailabilityOverride, ConsultationOffering, ConsultationType,
    RecurringAvailability,
};
use crate::store::{AvailabilityStore, OfferingStore};

const WINDOWS_TABLE: &str = "/rest/v1/doctor_availability";
const OVERRIDES_TABLE: &str = "/rest/v1/doctor_availability_overrides";
const OFFERINGS_TABLE: &str = "/rest/v1/consultation_offerings";

/// PostgREST-backed availability store.
///
/// Expects a partial unique index on
/// `doctor_availability (doctor_id, day_of_week, start_time, end_time) WHERE deleted_at IS NULL`
/// and a primary key of `(doctor_id, consultation_type)` on `consultation_offerings`.
pub struct SupabaseAvailabilityStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAvailabilityStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn store_error(e: DatabaseError) -> AvailabilityError {
    AvailabilityError::Store(e.to_string())
}

fn first_row<T>(rows: Vec<T>, id: Uuid) -> Result<T, AvailabilityError> {
    rows.into_iter().next().ok_or(AvailabilityError::NotFound(id))
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn get_recurring_windows(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<RecurringAvailability>, AvailabilityError> {
        let path = format!(
            "{}?doctor_id=eq.{}&day_of_week=eq.{}&deleted_at=is.null&order=start_time.asc",
            WINDOWS_TABLE, doctor_id, day_of_week
        );
        self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)
    }

    async fn list_windows(&self, doctor_id: Uuid) -> Result<Vec<RecurringAvailability>, AvailabilityError> {
        let path = format!(
            "{}?doctor_id=eq.{}&deleted_at=is.null&order=day_of_week.asc,start_time.asc",
            WINDOWS_TABLE, doctor_id
        );
        self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)
    }

    async fn insert_window(&self, window: RecurringAvailability) -> Result<RecurringAvailability, AvailabilityError> {
        debug!("Persisting availability window {} for doctor {}", window.id, window.doctor_id);
        let body = serde_json::to_value(&window).map_err(|e| AvailabilityError::Store(e.to_string()))?;

        let rows: Vec<RecurringAvailability> = self
            .supabase
            .request_with_representation(Method::POST, WINDOWS_TABLE, None, Some(body))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    AvailabilityError::DuplicateWindow
                } else {
                    store_error(e)
                }
            })?;

        first_row(rows, window.id)
    }

    async fn soft_delete_window(
        &self,
        window_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<RecurringAvailability, AvailabilityError> {
        let path = format!("{}?id=eq.{}&deleted_at=is.null", WINDOWS_TABLE, window_id);
        let rows: Vec<RecurringAvailability> = self
            .supabase
            .request_with_representation(
                Method::PATCH,
                &path,
                None,
                Some(json!({ "deleted_at": timestamp(deleted_at) })),
            )
            .await
            .map_err(store_error)?;

        first_row(rows, window_id)
    }

    async fn get_overrides(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AvailabilityOverride>, AvailabilityError> {
        let path = format!(
            "{}?doctor_id=eq.{}&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            OVERRIDES_TABLE,
            doctor_id,
            timestamp(to),
            timestamp(from)
        );
        self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)
    }

    async fn insert_override(&self, entry: AvailabilityOverride) -> Result<AvailabilityOverride, AvailabilityError> {
        let body = serde_json::to_value(&entry).map_err(|e| AvailabilityError::Store(e.to_string()))?;
        let rows: Vec<AvailabilityOverride> = self
            .supabase
            .request_with_representation(Method::POST, OVERRIDES_TABLE, None, Some(body))
            .await
            .map_err(store_error)?;

        first_row(rows, entry.id)
    }

    async fn delete_override(&self, override_id: Uuid) -> Result<AvailabilityOverride, AvailabilityError> {
        let path = format!("{}?id=eq.{}", OVERRIDES_TABLE, override_id);
        let rows: Vec<AvailabilityOverride> = self
            .supabase
            .request_with_representation(Method::DELETE, &path, None, None)
            .await
            .map_err(store_error)?;

        first_row(rows, override_id)
    }
}

#[async_trait]
impl OfferingStore for SupabaseAvailabilityStore {
    async fn get_offering(
        &self,
        doctor_id: Uuid,
        consultation_type: ConsultationType,
    ) -> Result<Option<ConsultationOffering>, AvailabilityError> {
        let path = format!(
            "{}?doctor_id=eq.{}&consultation_type=eq.{}&limit=1",
            OFFERINGS_TABLE, doctor_id, consultation_type
        );
        let rows: Vec<ConsultationOffering> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().next())
    }

    async fn upsert_offering(&self, offering: ConsultationOffering) -> Result<ConsultationOffering, AvailabilityError> {
        let path = format!("{}?on_conflict=doctor_id,consultation_type", OFFERINGS_TABLE);
        let body = serde_json::to_value(&offering).map_err(|e| AvailabilityError::Store(e.to_string()))?;
        let rows: Vec<ConsultationOffering> = self
            .supabase
            .upsert(&path, None, body)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AvailabilityError::Store("Upsert returned no offering".to_string()))
    }
}
