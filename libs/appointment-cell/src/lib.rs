pub mod clock;
pub mod handlers;
pub mod intervals;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use models::*;
pub use services::*;
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
