use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AvailabilityError, CreateAvailabilityOverrideRequest, CreateAvailabilityRequest,
    UpsertOfferingRequest,
};
use crate::services::AvailabilityService;

impl From<AvailabilityError> for AppError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
            AvailabilityError::DuplicateWindow => AppError::Conflict(e.to_string()),
            AvailabilityError::NotFound(_) => AppError::NotFound(e.to_string()),
            AvailabilityError::Store(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// RECURRING AVAILABILITY
// ==============================================================================

pub async fn list_availability(
    State(service): State<Arc<AvailabilityService>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let windows = service.list_windows(doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "windows": windows,
        "total": windows.len()
    })))
}

pub async fn create_availability(
    State(service): State<Arc<AvailabilityService>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let window = service.add_window(doctor_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "window": window
    })))
}

pub async fn delete_availability(
    State(service): State<Arc<AvailabilityService>>,
    Path(window_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let window = service.remove_window(window_id).await?;

    Ok(Json(json!({
        "success": true,
        "window": window
    })))
}

// ==============================================================================
// OVERRIDES
// ==============================================================================

pub async fn create_availability_override(
    State(service): State<Arc<AvailabilityService>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateAvailabilityOverrideRequest>,
) -> Result<Json<Value>, AppError> {
    let entry = service.add_override(doctor_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "override": entry
    })))
}

pub async fn delete_availability_override(
    State(service): State<Arc<AvailabilityService>>,
    Path(override_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let entry = service.remove_override(override_id).await?;

    Ok(Json(json!({
        "success": true,
        "override": entry
    })))
}

// ==============================================================================
// OFFERINGS
// ==============================================================================

pub async fn upsert_offering(
    State(service): State<Arc<AvailabilityService>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpsertOfferingRequest>,
) -> Result<Json<Value>, AppError> {
    let offering = service.upsert_offering(doctor_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "offering": offering
    })))
}
