pub mod appointment;
pub mod booking;
pub mod dashboard;
pub mod lifecycle;

pub use appointment::{Actor, AppointmentService};
pub use booking::AppointmentBookingService;
pub use dashboard::DashboardService;
pub use lifecycle::AppointmentLifecycleService;
