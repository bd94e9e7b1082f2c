// libs/doctor-cell/tests/supabase_store_test.rs

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::*;
use doctor_cell::store::{AvailabilityStore, OfferingStore, SupabaseAvailabilityStore};
use shared_database::SupabaseClient;

async fn setup() -> (MockServer, SupabaseAvailabilityStore) {
    let mock_server = MockServer::start().await;
    let client = Arc::new(SupabaseClient::with_base_url(&mock_server.uri(), "test-anon-key"));
    (mock_server, SupabaseAvailabilityStore::new(client))
}

fn window_row(id: Uuid, doctor_id: Uuid, day: i32) -> serde_json::Value {
    json!({
        "id": id,
        "doctor_id": doctor_id,
        "day_of_week": day,
        "start_time": "09:00:00",
        "end_time": "17:00:00",
        "created_at": Utc::now().to_rfc3339(),
        "deleted_at": null
    })
}

#[tokio::test]
async fn reads_active_windows_for_weekday() {
    let (mock_server, store) = setup().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("day_of_week", "eq.2"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![window_row(Uuid::new_v4(), doctor_id, 2)]))
        .mount(&mock_server)
        .await;

    let windows = store.get_recurring_windows(doctor_id, 2).await.unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    assert!(windows[0].is_active());
}

#[tokio::test]
async fn unique_violation_maps_to_duplicate_window() {
    let (mock_server, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&mock_server)
        .await;

    let window = RecurringAvailability {
        id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        day_of_week: 1,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        created_at: Utc::now(),
        deleted_at: None,
    };

    assert_matches!(store.insert_window(window).await, Err(AvailabilityError::DuplicateWindow));
}

#[tokio::test]
async fn soft_delete_of_missing_window_is_not_found() {
    let (mock_server, store) = setup().await;
    let window_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("id", format!("eq.{}", window_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    assert_matches!(
        store.soft_delete_window(window_id, Utc::now()).await,
        Err(AvailabilityError::NotFound(id)) if id == window_id
    );
}

#[tokio::test]
async fn offering_lookup_returns_none_when_absent() {
    let (mock_server, store) = setup().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultation_offerings"))
        .and(query_param("consultation_type", "eq.FollowUpConsultation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    let offering = store
        .get_offering(doctor_id, ConsultationType::FollowUpConsultation)
        .await
        .unwrap();
    assert!(offering.is_none());
}

#[tokio::test]
async fn backend_failure_surfaces_as_store_error() {
    let (mock_server, store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability_overrides"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let now = Utc::now();
    let result = store
        .get_overrides(Uuid::new_v4(), now, now + chrono::Duration::days(1))
        .await;
    assert_matches!(result, Err(AvailabilityError::Store(_)));
}
