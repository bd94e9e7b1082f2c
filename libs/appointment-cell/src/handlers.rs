// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AppointmentRangeQuery, BookSlotRequest, CancelAppointmentRequest, CompleteAppointmentRequest,
    RescheduleAppointmentRequest, SchedulingError, SlotQuery,
};
use crate::services::SchedulingEngine;

impl From<SchedulingError> for AppError {
    fn from(e: SchedulingError) -> Self {
        match e {
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::UnknownOffering { .. } => AppError::BadRequest(e.to_string()),
            SchedulingError::Conflict(_) | SchedulingError::InvalidState { .. } => AppError::Conflict(e.to_string()),
            SchedulingError::NotFound(_) => AppError::NotFound(e.to_string()),
            SchedulingError::Busy { .. } => AppError::Busy(e.to_string()),
            SchedulingError::Store(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// SLOTS AND BOOKING
// ==============================================================================

pub async fn list_available_slots(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = engine
        .list_available_slots(doctor_id, query.date, query.consultation_type)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "consultation_type": query.consultation_type,
        "slots": slots,
        "total": slots.len()
    })))
}

pub async fn book_slot(
    State(engine): State<Arc<SchedulingEngine>>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine.book_slot(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn reschedule_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine.reschedule_appointment(appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "previous_appointment_id": appointment_id
    })))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

pub async fn confirm_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine.confirm_appointment(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn cancel_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine.cancel_appointment(appointment_id, &request.reason).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn complete_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<CompleteAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let appointment = engine
        .complete_appointment(appointment_id, request.actual_start, request.actual_end)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

// ==============================================================================
// QUERIES
// ==============================================================================

pub async fn get_appointment(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = engine.get_appointment(appointment_id).await?;
    Ok(Json(json!(appointment)))
}

pub async fn get_reschedule_chain(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let chain = engine.reschedule_chain(appointment_id).await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "chain": chain,
        "total": chain.len()
    })))
}

pub async fn list_doctor_appointments(
    State(engine): State<Arc<SchedulingEngine>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AppointmentRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = engine
        .list_doctor_appointments(doctor_id, query.from, query.to)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}
