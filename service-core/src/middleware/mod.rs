//! Axum middleware shared by all services.
pub mod metrics;
pub mod tracing;
