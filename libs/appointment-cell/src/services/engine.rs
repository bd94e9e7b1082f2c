use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use doctor_cell::store::{AvailabilityStore, InMemoryAvailabilityStore, OfferingStore};

use crate::clock::Clock;
use crate::models::{
    Appointment, BookSlotRequest, ConsultationType, RescheduleAppointmentRequest, SchedulingError, Slot,
    StoreError,
};
use crate::services::booking::BookingCoordinator;
use crate::services::events::AppointmentEventPublisher;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::reschedule::RescheduleService;
use crate::services::slots::SlotComputer;
use crate::store::{AppointmentStore, InMemoryAppointmentStore};

/// The persistence collaborators the engine reads and writes through.
#[derive(Clone)]
pub struct SchedulingStores {
    pub availability: Arc<dyn AvailabilityStore>,
    pub offerings: Arc<dyn OfferingStore>,
    pub appointments: Arc<dyn AppointmentStore>,
}

impl SchedulingStores {
    /// Process-local stores; availability and offerings share one instance.
    pub fn in_memory() -> Self {
        let availability = Arc::new(InMemoryAvailabilityStore::new());
        Self {
            availability: availability.clone(),
            offerings: availability,
            appointments: Arc::new(InMemoryAppointmentStore::new()),
        }
    }
}

/// Single entry point for slot queries, bookings and lifecycle changes.
pub struct SchedulingEngine {
    slots: SlotComputer,
    coordinator: Arc<BookingCoordinator>,
    lifecycle: Arc<AppointmentLifecycleService>,
    reschedule: RescheduleService,
    appointments: Arc<dyn AppointmentStore>,
}

impl SchedulingEngine {
    pub fn new(
        stores: SchedulingStores,
        events: Arc<dyn AppointmentEventPublisher>,
        clock: Arc<dyn Clock>,
        config: &SchedulingConfig,
    ) -> Self {
        let slots = SlotComputer::new(
            stores.availability.clone(),
            stores.offerings.clone(),
            stores.appointments.clone(),
            clock.clone(),
        );
        let coordinator = Arc::new(BookingCoordinator::new(
            stores.appointments.clone(),
            stores.availability.clone(),
            stores.offerings.clone(),
            events.clone(),
            clock.clone(),
            config.lock_wait,
        ));
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            stores.appointments.clone(),
            events.clone(),
            clock,
        ));
        let reschedule = RescheduleService::new(
            coordinator.clone(),
            lifecycle.clone(),
            stores.appointments.clone(),
            events,
        );

        Self {
            slots,
            coordinator,
            lifecycle,
            reschedule,
            appointments: stores.appointments,
        }
    }

    // ==============================================================================
    // SLOTS AND BOOKING
    // ==============================================================================

    pub async fn list_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        consultation_type: ConsultationType,
    ) -> Result<Vec<Slot>, SchedulingError> {
        self.slots.list_available_slots(doctor_id, date, consultation_type).await
    }

    pub async fn book_slot(&self, request: BookSlotRequest) -> Result<Appointment, SchedulingError> {
        self.coordinator.book(request).await
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        self.reschedule.reschedule(appointment_id, request).await
    }

    // ==============================================================================
    // LIFECYCLE
    // ==============================================================================

    pub async fn confirm_appointment(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.lifecycle.confirm(appointment_id).await
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid, reason: &str) -> Result<Appointment, SchedulingError> {
        self.lifecycle.cancel(appointment_id, reason).await
    }

    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        actual_start: Option<DateTime<Utc>>,
        actual_end: Option<DateTime<Utc>>,
    ) -> Result<Appointment, SchedulingError> {
        self.lifecycle.complete(appointment_id, actual_start, actual_end).await
    }

    // ==============================================================================
    // QUERIES
    // ==============================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        Ok(self.appointments.get(appointment_id).await?)
    }

    pub async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        if from >= to {
            return Err(SchedulingError::Validation(
                "Range start must be before range end".to_string(),
            ));
        }
        Ok(self.appointments.list_for_doctor(doctor_id, from, to).await?)
    }

    /// The appointment followed by its predecessors, newest first.
    #[instrument(skip(self))]
    pub async fn reschedule_chain(&self, appointment_id: Uuid) -> Result<Vec<Appointment>, SchedulingError> {
        let mut chain = vec![self.appointments.get(appointment_id).await?];
        let mut seen: HashSet<Uuid> = HashSet::from([appointment_id]);

        while let Some(previous_id) = chain.last().and_then(|a| a.previous_appointment_id) {
            if !seen.insert(previous_id) {
                warn!("Reschedule chain of {} loops back to {}", appointment_id, previous_id);
                break;
            }
            match self.appointments.get(previous_id).await {
                Ok(previous) => chain.push(previous),
                Err(StoreError::NotFound(_)) => {
                    debug!("Predecessor {} of chain {} no longer stored", previous_id, appointment_id);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(chain)
    }
}
