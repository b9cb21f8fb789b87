pub mod api;
pub mod config;
pub mod console;
pub mod models;
pub mod services;
pub mod storage;

pub use models::*;
pub use services::*;
