#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentStatus, BookSlotRequest, ConsultationType, StoreError,
};
use appointment_cell::services::{BroadcastEventPublisher, SchedulingEngine, SchedulingStores};
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore};
use appointment_cell::FixedClock;
use doctor_cell::models::{CreateAvailabilityRequest, UpsertOfferingRequest};
use doctor_cell::services::AvailabilityService;
use doctor_cell::store::InMemoryAvailabilityStore;
use shared_config::SchedulingConfig;

pub fn at(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 2030-01-08, a Tuesday.
pub fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 8).unwrap()
}

/// Monday morning before the Tuesday under test.
pub fn monday_morning() -> DateTime<Utc> {
    at("2030-01-07T08:00:00Z")
}

pub fn tuesday_at(h: u32, m: u32) -> DateTime<Utc> {
    tuesday().and_time(hm(h, m)).and_utc()
}

pub struct Harness {
    pub engine: Arc<SchedulingEngine>,
    pub availability: Arc<AvailabilityService>,
    pub events: Arc<BroadcastEventPublisher>,
    pub clock: Arc<FixedClock>,
    pub config: SchedulingConfig,
}

impl Harness {
    /// Engine over in-memory stores.
    pub fn new() -> Self {
        Self::build(Arc::new(InMemoryAppointmentStore::new()), SchedulingConfig::default())
    }

    pub fn build(appointments: Arc<dyn AppointmentStore>, config: SchedulingConfig) -> Self {
        let availability_store = Arc::new(InMemoryAvailabilityStore::new());
        let stores = SchedulingStores {
            availability: availability_store.clone(),
            offerings: availability_store.clone(),
            appointments,
        };

        let events = Arc::new(BroadcastEventPublisher::new(config.event_buffer));
        let clock = Arc::new(FixedClock::new(monday_morning()));
        let engine = Arc::new(SchedulingEngine::new(stores, events.clone(), clock.clone(), &config));
        let availability = Arc::new(AvailabilityService::new(
            availability_store.clone(),
            availability_store,
            &config,
        ));

        Self {
            engine,
            availability,
            events,
            clock,
            config,
        }
    }

    /// A doctor seeing patients Tuesdays 10:00-12:00 for 30 minute general consultations.
    pub async fn tuesday_doctor(&self) -> Uuid {
        let doctor_id = Uuid::new_v4();
        self.open_window(doctor_id, 2, hm(10, 0), hm(12, 0)).await;
        self.offer(doctor_id, ConsultationType::GeneralConsultation, 50.0, 30).await;
        doctor_id
    }

    pub async fn open_window(&self, doctor_id: Uuid, day: i32, start: NaiveTime, end: NaiveTime) {
        self.availability
            .add_window(
                doctor_id,
                CreateAvailabilityRequest {
                    day_of_week: day,
                    start_time: start,
                    end_time: end,
                },
            )
            .await
            .unwrap();
    }

    pub async fn offer(&self, doctor_id: Uuid, consultation_type: ConsultationType, fee: f64, minutes: i64) {
        self.availability
            .upsert_offering(
                doctor_id,
                UpsertOfferingRequest {
                    consultation_type,
                    fee_amount: fee,
                    session_duration_minutes: minutes,
                },
            )
            .await
            .unwrap();
    }

    pub async fn slot_starts(&self, doctor_id: Uuid) -> Vec<String> {
        self.engine
            .list_available_slots(doctor_id, tuesday(), ConsultationType::GeneralConsultation)
            .await
            .unwrap()
            .iter()
            .map(|s| s.start_time.format("%H:%M").to_string())
            .collect()
    }
}

pub fn general_request(doctor_id: Uuid, start: DateTime<Utc>) -> BookSlotRequest {
    BookSlotRequest {
        patient_id: Uuid::new_v4(),
        doctor_id,
        start_time: start,
        end_time: start + chrono::Duration::minutes(30),
        consultation_type: ConsultationType::GeneralConsultation,
    }
}

// ==============================================================================
// STORE WRAPPERS FOR FAULT INJECTION
// ==============================================================================

/// Delays the conflict lookup so a booking holds its doctor's lock for a while.
pub struct SlowOverlapStore {
    pub inner: InMemoryAppointmentStore,
    pub delay: StdDuration,
}

#[async_trait]
impl AppointmentStore for SlowOverlapStore {
    async fn get(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.inner.get(id).await
    }

    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_overlapping(doctor_id, start, end).await
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.list_for_doctor(doctor_id, from, to).await
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        self.inner.insert(appointment).await
    }

    async fn update(&self, appointment: Appointment, expected: AppointmentStatus) -> Result<Appointment, StoreError> {
        self.inner.update(appointment, expected).await
    }

    async fn discard(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.discard(id).await
    }
}

/// Rejects every write that would cancel an appointment.
pub struct CancelFailsStore {
    pub inner: InMemoryAppointmentStore,
}

#[async_trait]
impl AppointmentStore for CancelFailsStore {
    async fn get(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.inner.get(id).await
    }

    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.find_overlapping(doctor_id, start, end).await
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.inner.list_for_doctor(doctor_id, from, to).await
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        self.inner.insert(appointment).await
    }

    async fn update(&self, appointment: Appointment, expected: AppointmentStatus) -> Result<Appointment, StoreError> {
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.update(appointment, expected).await
    }

    async fn discard(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.discard(id).await
    }
}
