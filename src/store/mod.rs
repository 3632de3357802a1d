//! In-Memory Stores
//!
//! Users and appointments live in lock-guarded vectors for the lifetime of
//! the process. Every appointment operation is scoped to its owner.

mod appointments;
mod error;
mod users;

pub use appointments::{Appointment, AppointmentPatch, AppointmentStore, NewAppointment};
pub use error::{StoreError, StoreResult};
pub use users::{User, UserStore};
