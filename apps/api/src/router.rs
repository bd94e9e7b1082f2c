use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::SchedulingEngine;
use doctor_cell::router::doctor_routes;
use doctor_cell::services::AvailabilityService;

pub fn create_router(engine: Arc<SchedulingEngine>, availability: Arc<AvailabilityService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Amae Scheduling API is running!" }))
        .merge(doctor_routes(availability))
        .merge(appointment_routes(engine))
}
