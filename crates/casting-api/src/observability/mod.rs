//! Observability for the Casting API.
//!
//! Provides metric definitions and the Prometheus recorder.

pub mod metrics;
