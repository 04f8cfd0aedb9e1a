//! HTTP API handlers for skyport-importer

pub mod health;
pub mod import;
pub mod session;
pub mod upload;

pub use health::health_routes;
pub use import::import_routes;
pub use session::{session_routes, CurrentSession, SESSION_COOKIE};
pub use upload::upload_routes;
