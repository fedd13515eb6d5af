//! Crate includes reusable utils for services that handle common behavior.
//! Such as initializing the tracing framework and publishing status metrics.

pub mod logging;
pub mod status;

// Re-export tracing crate for convenience.
pub use tracing;
