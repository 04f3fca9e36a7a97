//! Engine configuration with documented defaults
//!
//! All scheduling knobs are collected here with an explanation of how they
//! change event processing.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{EngineError, Result};

/// How matched rules are ordered before execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleSelection {
    /// Rules run in the order they were registered
    Registration,
    /// Rules run by ascending priority, registration order breaks ties
    #[default]
    Priority,
}

/// How many matched rules execute per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Only the first ordered match executes
    FirstMatch,
    /// Every match executes in order, unless a rule stops the event
    #[default]
    AllMatches,
}

/// Configuration for the rule engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ordering applied to matched rules
    pub rule_selection: RuleSelection,

    /// Whether one or all matched rules execute
    pub execution: ExecutionMode,

    /// Maximum number of events a single pump drains
    ///
    /// Hitting the cap usually means a rule re-triggers itself. The pump
    /// logs a warning and leaves the rest of the queue for the next call.
    pub max_events_per_pump: usize,

    /// Drain the queue as soon as an event is raised outside of processing
    ///
    /// When disabled, raised events wait in the queue until `pump` is called.
    pub auto_pump: bool,

    /// Seed for the rule RNG used by chance requirements
    ///
    /// Two engines with the same seed, rules and inputs make the same rolls.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rule_selection: RuleSelection::Priority,
            execution: ExecutionMode::AllMatches,
            max_events_per_pump: 1024,
            auto_pump: true,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EngineError::ParseError(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| EngineError::ParseError(format!("{}: {}", path.display(), e)))
    }
}
