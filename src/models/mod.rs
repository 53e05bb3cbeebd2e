pub mod appointment;
pub mod dialogue;
pub mod menu;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus};
pub use dialogue::{BookingDraft, DialogueState};
pub use user::User;
