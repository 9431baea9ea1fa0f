pub mod jikan;
pub mod supabase;
pub mod traits;
