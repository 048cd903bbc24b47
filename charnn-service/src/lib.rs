pub mod components;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod types;


pub use config::ServiceConfig;
pub use server::{create_router, run_server, AppState};
