pub mod payment;
pub mod razorpay;

pub use payment::PaymentService;
pub use razorpay::{verify_signature, RazorpayClient};
