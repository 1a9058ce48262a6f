//! Cooldown gate implementation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cooldown configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Time that must be exceeded between two surfaced alerts of the same
    /// kind (milliseconds). Zero disables rate limiting.
    pub cooldown_ms: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self { cooldown_ms: 5000 }
    }
}

impl CooldownConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// State of one alert kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertState {
    /// Last time this alert was surfaced
    pub last_fired: Instant,
    /// Number of times surfaced
    pub fire_count: u64,
}

/// Per-kind cooldown. Callers pass the current instant so the gate never
/// reads the clock itself.
#[derive(Debug, Clone)]
pub struct CooldownGate<K> {
    config: CooldownConfig,
    states: HashMap<K, AlertState>,
}

impl<K> CooldownGate<K>
where
    K: Eq + Hash + Copy + Debug,
{
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// True on the first occurrence of `kind`, or once strictly more than
    /// the cooldown has passed since it was last surfaced
    pub fn should_fire(&self, kind: K, now: Instant) -> bool {
        let cooldown = self.config.cooldown();
        match self.states.get(&kind) {
            None => true,
            Some(_) if cooldown.is_zero() => true,
            Some(state) => {
                let elapsed = now.saturating_duration_since(state.last_fired);
                if elapsed <= cooldown {
                    debug!(?kind, ?elapsed, "Alert suppressed: in cooldown period");
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Record that an alert was surfaced
    pub fn record_fire(&mut self, kind: K, now: Instant) {
        let state = self.states.entry(kind).or_insert(AlertState {
            last_fired: now,
            fire_count: 0,
        });
        state.last_fired = now;
        state.fire_count += 1;
    }

    /// Check and record in one step. Returns whether the alert surfaces.
    pub fn try_fire(&mut self, kind: K, now: Instant) -> bool {
        if self.should_fire(kind, now) {
            self.record_fire(kind, now);
            true
        } else {
            false
        }
    }

    /// State for one kind, if it ever fired
    pub fn state(&self, kind: K) -> Option<&AlertState> {
        self.states.get(&kind)
    }

    /// Times `kind` has been surfaced
    pub fn fire_count(&self, kind: K) -> u64 {
        self.states.get(&kind).map_or(0, |s| s.fire_count)
    }

    pub fn config(&self) -> &CooldownConfig {
        &self.config
    }

    /// Forget all alert history
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

impl<K> Default for CooldownGate<K>
where
    K: Eq + Hash + Copy + Debug,
{
    fn default() -> Self {
        Self::new(CooldownConfig::default())
    }
}
