pub mod router;

pub use router::{create_app, create_router};
