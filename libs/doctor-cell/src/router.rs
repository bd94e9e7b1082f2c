use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::handlers;
use crate::services::AvailabilityService;

pub fn doctor_routes(service: Arc<AvailabilityService>) -> Router {
    Router::new()
        .route(
            "/doctors/{doctor_id}/availability",
            get(handlers::list_availability).post(handlers::create_availability),
        )
        .route("/doctors/availability/{window_id}", delete(handlers::delete_availability))
        .route("/doctors/{doctor_id}/overrides", post(handlers::create_availability_override))
        .route("/doctors/overrides/{override_id}", delete(handlers::delete_availability_override))
        .route("/doctors/{doctor_id}/offerings", put(handlers::upsert_offering))
        .with_state(service)
}
