use tokio::sync::broadcast;
use tracing::debug;

use crate::models::AppointmentEvent;

/// Outbound hook for notifications, billing and similar listeners.
pub trait AppointmentEventPublisher: Send + Sync {
    fn publish(&self, event: AppointmentEvent);
}

/// Fan-out over a bounded broadcast channel. Slow subscribers lag and lose
/// the oldest events; publishing never blocks the booking path.
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<AppointmentEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppointmentEvent> {
        self.sender.subscribe()
    }
}

impl AppointmentEventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: AppointmentEvent) {
        let appointment_id = event.appointment().id;
        match self.sender.send(event) {
            Ok(receivers) => debug!("Published event for appointment {} to {} subscribers", appointment_id, receivers),
            Err(_) => debug!("No subscribers for appointment {} event", appointment_id),
        }
    }
}
