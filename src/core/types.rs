//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a card stored in the card tree
///
/// Handles stay valid for the lifetime of the tree, including after the
/// card is detached from its owner or dropped from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardHandle(pub u32);

impl CardHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Registry identity of a card: template id plus instance index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardKey {
    pub id: String,
    pub index: u32,
}

impl CardKey {
    pub fn new(id: impl Into<String>, index: u32) -> Self {
        Self {
            id: id.into(),
            index,
        }
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.index)
    }
}

/// Identifier for an external event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u32);
