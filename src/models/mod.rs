mod api;

pub use api::{ErrorResponse, HealthResponse, VersionResponse};
