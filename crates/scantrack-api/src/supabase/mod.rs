pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::SupabaseAuth;
pub use client::SupabaseStore;
pub use error::SupabaseError;
