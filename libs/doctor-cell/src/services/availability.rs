use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::models::{
    AvailabilityError, AvailabilityOverride, ConsultationOffering, ConsultationType,
    CreateAvailabilityOverrideRequest, CreateAvailabilityRequest, RecurringAvailability,
    UpsertOfferingRequest,
};
use crate::store::{AvailabilityStore, OfferingStore};

/// Doctor-facing maintenance of weekly windows, overrides and offerings.
///
/// The booking flow never writes through here; it only reads the stores.
pub struct AvailabilityService {
    store: Arc<dyn AvailabilityStore>,
    offerings: Arc<dyn OfferingStore>,
    max_session_minutes: i64,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        offerings: Arc<dyn OfferingStore>,
        config: &SchedulingConfig,
    ) -> Self {
        Self {
            store,
            offerings,
            max_session_minutes: config.max_session_minutes,
        }
    }

    /// Create a recurring weekly window for a doctor
    pub async fn add_window(
        &self,
        doctor_id: Uuid,
        request: CreateAvailabilityRequest,
    ) -> Result<RecurringAvailability, AvailabilityError> {
        debug!("Creating availability for doctor {} on day {}", doctor_id, request.day_of_week);

        validate_window(&request)?;

        let window = RecurringAvailability {
            id: Uuid::new_v4(),
            doctor_id,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            created_at: Utc::now(),
            deleted_at: None,
        };

        let window = self.store.insert_window(window).await.map_err(|e| {
            if e == AvailabilityError::DuplicateWindow {
                warn!(
                    "Rejected duplicate window {}-{} for doctor {} on day {}",
                    request.start_time, request.end_time, doctor_id, request.day_of_week
                );
            }
            e
        })?;

        info!("Availability window {} created for doctor {}", window.id, doctor_id);
        Ok(window)
    }

    /// Logically remove a window; the row stays for audit
    pub async fn remove_window(&self, window_id: Uuid) -> Result<RecurringAvailability, AvailabilityError> {
        let removed = self.store.soft_delete_window(window_id, Utc::now()).await?;
        info!("Availability window {} removed for doctor {}", window_id, removed.doctor_id);
        Ok(removed)
    }

    pub async fn list_windows(&self, doctor_id: Uuid) -> Result<Vec<RecurringAvailability>, AvailabilityError> {
        self.store.list_windows(doctor_id).await
    }

    pub async fn add_override(
        &self,
        doctor_id: Uuid,
        request: CreateAvailabilityOverrideRequest,
    ) -> Result<AvailabilityOverride, AvailabilityError> {
        debug!(
            "Creating {} override for doctor {} from {} to {}",
            request.kind, doctor_id, request.start_time, request.end_time
        );

        if request.start_time >= request.end_time {
            return Err(AvailabilityError::Validation(
                "Override start must be before its end".to_string(),
            ));
        }

        let entry = AvailabilityOverride {
            id: Uuid::new_v4(),
            doctor_id,
            start_time: request.start_time,
            end_time: request.end_time,
            kind: request.kind,
            reason: request.reason,
            created_at: Utc::now(),
        };

        let entry = self.store.insert_override(entry).await?;
        info!("Availability override {} ({}) created for doctor {}", entry.id, entry.kind, doctor_id);
        Ok(entry)
    }

    pub async fn remove_override(&self, override_id: Uuid) -> Result<AvailabilityOverride, AvailabilityError> {
        let removed = self.store.delete_override(override_id).await?;
        info!("Availability override {} removed for doctor {}", override_id, removed.doctor_id);
        Ok(removed)
    }

    pub async fn upsert_offering(
        &self,
        doctor_id: Uuid,
        request: UpsertOfferingRequest,
    ) -> Result<ConsultationOffering, AvailabilityError> {
        validate_offering(&request, self.max_session_minutes)?;

        let offering = ConsultationOffering {
            doctor_id,
            consultation_type: request.consultation_type,
            fee_amount: request.fee_amount,
            session_duration_minutes: request.session_duration_minutes,
            updated_at: Utc::now(),
        };

        let offering = self.offerings.upsert_offering(offering).await?;
        info!(
            "Offering {} for doctor {} set to {:.2} / {} min",
            offering.consultation_type, doctor_id, offering.fee_amount, offering.session_duration_minutes
        );
        Ok(offering)
    }

    pub async fn get_offering(
        &self,
        doctor_id: Uuid,
        consultation_type: ConsultationType,
    ) -> Result<Option<ConsultationOffering>, AvailabilityError> {
        self.offerings.get_offering(doctor_id, consultation_type).await
    }
}

pub fn validate_window(request: &CreateAvailabilityRequest) -> Result<(), AvailabilityError> {
    if !(0..=6).contains(&request.day_of_week) {
        return Err(AvailabilityError::Validation(
            "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }

    if request.start_time >= request.end_time {
        return Err(AvailabilityError::Validation(
            "Start time must be before end time".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_offering(request: &UpsertOfferingRequest, max_session_minutes: i64) -> Result<(), AvailabilityError> {
    if request.session_duration_minutes <= 0 || request.session_duration_minutes > max_session_minutes {
        return Err(AvailabilityError::Validation(format!(
            "Session duration must be between 1 and {} minutes",
            max_session_minutes
        )));
    }

    if !request.fee_amount.is_finite() || request.fee_amount < 0.0 {
        return Err(AvailabilityError::Validation(
            "Fee must be a non-negative amount".to_string(),
        ));
    }

    Ok(())
}
