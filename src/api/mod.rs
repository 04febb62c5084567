pub mod middleware;
pub mod services;

pub use services::{ApiSettings, configure_routes};
