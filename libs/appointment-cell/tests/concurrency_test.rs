// libs/appointment-cell/tests/concurrency_test.rs
mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use futures::future::join_all;

use appointment_cell::models::{AppointmentStatus, RescheduleAppointmentRequest, SchedulingError};
use appointment_cell::store::InMemoryAppointmentStore;
use shared_config::SchedulingConfig;

use common::*;

fn config_with_wait(wait: Duration) -> SchedulingConfig {
    SchedulingConfig {
        lock_wait: wait,
        ..SchedulingConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_patients_get_exactly_one_booking() {
    let h = Harness::new();
    let doctor_id = h.tuesday_doctor().await;

    let attempts = (0..16).map(|_| {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.book_slot(general_request(doctor_id, tuesday_at(10, 30))).await })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(result, Err(SchedulingError::Conflict(_)));
    }

    let agenda = h
        .engine
        .list_doctor_appointments(doctor_id, tuesday_at(0, 0), tuesday_at(23, 59))
        .await
        .unwrap();
    assert_eq!(agenda.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_patients_fill_every_slot_once() {
    let h = Harness::new();
    let doctor_id = h.tuesday_doctor().await;
    let starts = [tuesday_at(10, 0), tuesday_at(10, 30), tuesday_at(11, 0), tuesday_at(11, 30)];

    let attempts = (0..24).map(|i| {
        let engine = h.engine.clone();
        let start = starts[i % starts.len()];
        tokio::spawn(async move { engine.book_slot(general_request(doctor_id, start)).await })
    });
    let booked: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .filter_map(|r| r.unwrap().ok())
        .collect();

    assert_eq!(booked.len(), starts.len());
    for (i, a) in booked.iter().enumerate() {
        for b in &booked[i + 1..] {
            assert!(!a.overlaps(b.scheduled_start, b.scheduled_end));
        }
    }
    assert!(h.slot_starts(doctor_id).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiting_too_long_for_a_doctor_is_busy() {
    let store = Arc::new(SlowOverlapStore {
        inner: InMemoryAppointmentStore::new(),
        delay: Duration::from_millis(400),
    });
    let h = Harness::build(store, config_with_wait(Duration::from_millis(50)));
    let doctor_id = h.tuesday_doctor().await;

    let first = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.book_slot(general_request(doctor_id, tuesday_at(10, 0))).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = h
        .engine
        .book_slot(general_request(doctor_id, tuesday_at(11, 0)))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_matches!(err, SchedulingError::Busy { doctor_id: busy, .. } if busy == doctor_id);

    assert!(first.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_doctors_book_in_parallel() {
    let store = Arc::new(SlowOverlapStore {
        inner: InMemoryAppointmentStore::new(),
        delay: Duration::from_millis(300),
    });
    let h = Harness::build(store, config_with_wait(Duration::from_millis(50)));
    let doctors = [
        h.tuesday_doctor().await,
        h.tuesday_doctor().await,
        h.tuesday_doctor().await,
    ];

    let started = Instant::now();
    let attempts = doctors.iter().map(|&doctor_id| {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.book_slot(general_request(doctor_id, tuesday_at(10, 0))).await })
    });
    let results = join_all(attempts).await;

    assert!(results.into_iter().all(|r| r.unwrap().is_ok()));
    // Serialized work would need at least 900ms
    assert!(started.elapsed() < Duration::from_millis(850));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reschedules_of_one_appointment_produce_one_successor() {
    let h = Harness::new();
    let doctor_id = h.tuesday_doctor().await;
    let original = h.engine.book_slot(general_request(doctor_id, tuesday_at(10, 0))).await.unwrap();

    let targets = [tuesday_at(10, 30), tuesday_at(11, 0), tuesday_at(11, 30)];
    let attempts = targets.iter().map(|&start| {
        let engine = h.engine.clone();
        let id = original.id;
        tokio::spawn(async move {
            engine
                .reschedule_appointment(
                    id,
                    RescheduleAppointmentRequest {
                        new_start_time: start,
                        new_end_time: start + chrono::Duration::minutes(30),
                    },
                )
                .await
        })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for failed in results.iter().filter(|r| r.is_err()) {
        assert_matches!(failed, Err(SchedulingError::InvalidState { current: AppointmentStatus::Cancelled, .. }));
    }

    let agenda = h
        .engine
        .list_doctor_appointments(doctor_id, tuesday_at(0, 0), tuesday_at(23, 59))
        .await
        .unwrap();
    let active: Vec<_> = agenda.iter().filter(|a| a.holds_window()).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].previous_appointment_id, Some(original.id));
}
