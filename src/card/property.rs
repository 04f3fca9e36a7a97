//! Numeric card properties with named modifiers

use serde::{Deserialize, Serialize};

/// How a modifier combines with the base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    /// Added to the base value
    #[default]
    Flat,
    /// Fraction applied after flat modifiers (0.25 = +25%)
    Percent,
}

/// A named adjustment to a property's value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Identifies the modifier for later removal
    pub source: String,
    #[serde(default)]
    pub kind: ModifierKind,
    pub amount: f64,
}

impl Modifier {
    pub fn flat(source: impl Into<String>, amount: f64) -> Self {
        Self {
            source: source.into(),
            kind: ModifierKind::Flat,
            amount,
        }
    }

    pub fn percent(source: impl Into<String>, amount: f64) -> Self {
        Self {
            source: source.into(),
            kind: ModifierKind::Percent,
            amount,
        }
    }
}

/// A named numeric property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    name: String,
    base_value: f64,
    modifiers: Vec<Modifier>,
}

impl Property {
    pub fn new(name: impl Into<String>, base_value: f64) -> Self {
        Self {
            name: name.into(),
            base_value,
            modifiers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_base_value(&self) -> f64 {
        self.base_value
    }

    pub fn set_base_value(&mut self, value: f64) {
        self.base_value = value;
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Add a modifier, replacing any existing one from the same source
    pub fn add_modifier(&mut self, modifier: Modifier) {
        match self.modifiers.iter_mut().find(|m| m.source == modifier.source) {
            Some(existing) => *existing = modifier,
            None => self.modifiers.push(modifier),
        }
    }

    /// Remove the modifier from `source`, returns true if one was present
    pub fn remove_modifier(&mut self, source: &str) -> bool {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.source != source);
        self.modifiers.len() != before
    }

    /// Effective value: `(base + flat) * (1 + percent)`
    pub fn value(&self) -> f64 {
        let (flat, percent) = self
            .modifiers
            .iter()
            .fold((0.0, 0.0), |(flat, percent), m| match m.kind {
                ModifierKind::Flat => (flat + m.amount, percent),
                ModifierKind::Percent => (flat, percent + m.amount),
            });
        (self.base_value + flat) * (1.0 + percent)
    }
}
