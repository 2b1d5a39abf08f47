mod fallback;
mod health;

pub use fallback::fallback;
pub use health::{health_check, version};
