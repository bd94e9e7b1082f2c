pub mod booking;
pub mod engine;
pub mod events;
pub mod lifecycle;
pub mod locks;
pub mod reschedule;
pub mod slots;

pub use booking::BookingCoordinator;
pub use engine::{SchedulingEngine, SchedulingStores};
pub use events::{AppointmentEventPublisher, BroadcastEventPublisher};
pub use lifecycle::{AppointmentLifecycleService, Transition};
pub use locks::{DoctorLockGuard, DoctorLockRegistry};
pub use reschedule::RescheduleService;
pub use slots::{compute_slots, open_intervals, SlotComputer};
