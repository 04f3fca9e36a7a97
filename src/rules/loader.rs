//! Load rule sets from TOML files
//!
//! Callback requirements and effects cannot be expressed in TOML; rules that
//! need them are built in code with [`RuleBuilder`](super::rule::RuleBuilder).

use serde::Deserialize;
use std::path::Path;

use super::rule::Rule;
use crate::core::error::{EngineError, Result};

#[derive(Debug, Deserialize)]
struct TomlRuleSet {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Parse and validate a rule set from a TOML string
pub fn parse_rules_toml(content: &str) -> Result<Vec<Rule>> {
    let set: TomlRuleSet =
        toml::from_str(content).map_err(|e| EngineError::ParseError(e.to_string()))?;
    for rule in &set.rules {
        rule.validate()?;
    }
    Ok(set.rules)
}

/// Load a rule set from a TOML file
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path)?;
    let rules = parse_rules_toml(&content)?;
    tracing::info!("Loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}
