//! Health Checks
//!
//! Named probes folded into one service status. The worst probe wins.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Health status, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// What a probe reports
pub type Probe = (HealthStatus, Option<String>);

type ProbeFn = Box<dyn Fn() -> Probe + Send + Sync>;

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

/// Result of one probe
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// Service health report
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    #[serde(rename = "status")]
    pub overall: HealthStatus,
    #[serde(rename = "uptime_secs", serialize_with = "as_secs")]
    pub uptime: Duration,
    pub version: String,
    pub checks: Vec<CheckResult>,
}

/// Registry of probes, run on demand
pub struct HealthCheck {
    probes: BTreeMap<String, ProbeFn>,
    started: Instant,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthCheck {
    pub fn new() -> Self {
        Self {
            probes: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    /// Add (or replace) the probe called `name`
    pub fn register<F>(&mut self, name: &str, probe: F)
    where
        F: Fn() -> Probe + Send + Sync + 'static,
    {
        self.probes.insert(name.to_string(), Box::new(probe));
    }

    /// Run every probe in name order
    pub fn check(&self) -> SystemHealth {
        let checks: Vec<CheckResult> = self
            .probes
            .iter()
            .map(|(name, probe)| {
                let start = Instant::now();
                let (status, message) = probe();
                CheckResult {
                    name: name.clone(),
                    status,
                    message,
                    duration: start.elapsed(),
                }
            })
            .collect();

        SystemHealth {
            overall: checks
                .iter()
                .map(|c| c.status)
                .max()
                .unwrap_or(HealthStatus::Healthy),
            uptime: self.started.elapsed(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }
    }
}
