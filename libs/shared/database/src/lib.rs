pub mod auth;
pub mod storage;
pub mod supabase;

pub use auth::{AuthSession, AuthUserRecord};
pub use supabase::{SupabaseClient, SupabaseError};
