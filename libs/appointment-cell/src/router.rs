use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::handlers;
use crate::services::SchedulingEngine;

pub fn appointment_routes(engine: Arc<SchedulingEngine>) -> Router {
    Router::new()
        .route("/doctors/{doctor_id}/slots", get(handlers::list_available_slots))
        .route("/doctors/{doctor_id}/appointments", get(handlers::list_doctor_appointments))
        .route("/appointments", post(handlers::book_slot))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route("/appointments/{appointment_id}/chain", get(handlers::get_reschedule_chain))
        .route("/appointments/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/appointments/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{appointment_id}/complete", post(handlers::complete_appointment))
        .with_state(engine)
}
