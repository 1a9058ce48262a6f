//! Alerting
//!
//! Rate limiting of repeated warnings and severity levels.

mod manager;

pub use manager::{AlertState, CooldownConfig, CooldownGate};

use serde::{Deserialize, Serialize};

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}
