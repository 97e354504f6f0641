pub mod handlers;
pub mod models;
pub mod server;
pub mod validation;

pub use models::*;
pub use server::{routes, start_server, AppState};
