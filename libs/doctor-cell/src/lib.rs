pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Doctor, DoctorError, Review, WorkingDay, WorkingHours};
pub use services::{DoctorService, ReviewService};
