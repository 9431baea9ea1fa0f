pub mod config;
pub mod debug_log;
pub mod error;
pub mod legacy;
pub mod models;
pub mod navigation;
pub mod slug;
pub mod storage;
pub mod view;
