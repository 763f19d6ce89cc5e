pub mod models;
pub mod service;

pub use models::*;
pub use service::{AppState, build_router, create_app_state};
