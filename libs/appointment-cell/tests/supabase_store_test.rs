// libs/appointment-cell/tests/supabase_store_test.rs

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{Appointment, AppointmentStatus, ConsultationType, StoreError};
use appointment_cell::store::{AppointmentStore, SupabaseAppointmentStore};
use shared_database::SupabaseClient;

async fn setup() -> (MockServer, SupabaseAppointmentStore) {
    let mock_server = MockServer::start().await;
    let client = Arc::new(SupabaseClient::with_base_url(&mock_server.uri(), "test-anon-key"));
    (mock_server, SupabaseAppointmentStore::new(client))
}

fn at(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
}

fn appointment(status: AppointmentStatus) -> Appointment {
    let start = at("2030-01-08T10:00:00Z");
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        scheduled_start: start,
        scheduled_end: start + Duration::minutes(30),
        consultation_type: ConsultationType::GeneralConsultation,
        fee: 50.0,
        duration_minutes: 30,
        status,
        previous_appointment_id: None,
        cancellation_reason: None,
        cancelled_at: None,
        actual_start: None,
        actual_end: None,
        created_at: start - Duration::days(1),
        updated_at: start - Duration::days(1),
    }
}

#[tokio::test]
async fn overlap_query_excludes_cancelled_and_uses_half_open_bounds() {
    let (mock_server, store) = setup().await;
    let existing = appointment(AppointmentStatus::Confirmed);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", existing.doctor_id)))
        .and(query_param("status", "neq.cancelled"))
        .and(query_param("scheduled_start", "lt.2030-01-08T10:30:00Z"))
        .and(query_param("scheduled_end", "gt.2030-01-08T10:15:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![&existing]))
        .mount(&mock_server)
        .await;

    let found = store
        .find_overlapping(existing.doctor_id, at("2030-01-08T10:15:00Z"), at("2030-01-08T10:30:00Z"))
        .await
        .unwrap();
    assert_eq!(found, vec![existing]);
}

#[tokio::test]
async fn overlap_query_keeps_sub_second_bounds() {
    let (mock_server, store) = setup().await;
    let existing = appointment(AppointmentStatus::Pending);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("scheduled_start", "lt.2030-01-08T10:00:00.250Z"))
        .and(query_param("scheduled_end", "gt.2030-01-08T09:30:00.500Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![&existing]))
        .mount(&mock_server)
        .await;

    let found = store
        .find_overlapping(
            existing.doctor_id,
            at("2030-01-08T09:30:00.500Z"),
            at("2030-01-08T10:00:00.250Z"),
        )
        .await
        .unwrap();
    assert_eq!(found, vec![existing]);
}

#[tokio::test]
async fn exclusion_violation_is_a_conflict() {
    let (mock_server, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint \"appointments_no_overlap\""
        })))
        .mount(&mock_server)
        .await;

    assert_matches!(
        store.insert(appointment(AppointmentStatus::Pending)).await,
        Err(StoreError::Conflict)
    );
}

#[tokio::test]
async fn insert_returns_the_stored_row() {
    let (mock_server, store) = setup().await;
    let new = appointment(AppointmentStatus::Pending);

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "id": new.id, "status": "pending" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![&new]))
        .mount(&mock_server)
        .await;

    assert_eq!(store.insert(new.clone()).await.unwrap(), new);
}

#[tokio::test]
async fn update_is_guarded_by_expected_status() {
    let (mock_server, store) = setup().await;
    let confirmed = appointment(AppointmentStatus::Confirmed);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", confirmed.id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![&confirmed]))
        .mount(&mock_server)
        .await;

    let updated = store.update(confirmed.clone(), AppointmentStatus::Pending).await.unwrap();
    assert_eq!(updated.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn empty_update_on_existing_row_is_stale() {
    let (mock_server, store) = setup().await;
    let stored = appointment(AppointmentStatus::Cancelled);
    let mut attempt = stored.clone();
    attempt.status = AppointmentStatus::Confirmed;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", stored.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![&stored]))
        .mount(&mock_server)
        .await;

    assert_matches!(
        store.update(attempt, AppointmentStatus::Pending).await,
        Err(StoreError::StaleWrite(id)) if id == stored.id
    );
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let (mock_server, store) = setup().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    assert_matches!(store.get(id).await, Err(StoreError::NotFound(missing)) if missing == id);
    assert_matches!(store.discard(id).await, Err(StoreError::NotFound(_)));
}

#[tokio::test]
async fn server_errors_surface_as_backend() {
    let (mock_server, store) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    assert_matches!(store.get(Uuid::new_v4()).await, Err(StoreError::Backend(_)));
}
