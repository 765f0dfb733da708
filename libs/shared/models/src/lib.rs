pub mod auth;
pub mod domain;
pub mod error;
pub mod profile;
pub mod response;

pub use domain::{AppointmentStatus, Gender, NotificationType, PaymentStatus, UserRole};
pub use error::AppError;
pub use profile::UserProfile;
pub use response::ApiResponse;
