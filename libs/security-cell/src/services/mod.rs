pub mod store;
pub mod validation;

pub use store::{MemoryStore, RateLimitStore, RedisStore};
pub use validation::ValidationService;
