//! Observability Module
//!
//! Health checks for the running service. Request counters live in
//! [`crate::metrics`].

mod health;

pub use health::{CheckResult, HealthCheck, HealthStatus, Probe, SystemHealth};
