//! Card events - the fixed vocabulary rules react to

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::CardHandle;

/// Kind of event, the first dispatch key of the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Card was attached to an owner
    Added,
    /// Card was detached from its owner
    Removed,
    /// Periodic update
    Tick,
    /// Manual activation
    Use,
    /// Named signal, dispatched further on its id
    Custom,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Added => "added",
            EventType::Removed => "removed",
            EventType::Tick => "tick",
            EventType::Use => "use",
            EventType::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Opaque data carried by an event
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The owner involved in a lifecycle event
    Owner(CardHandle),
    /// Free-form data attached by game code or a signal effect
    Value(serde_json::Value),
}

/// An immutable event value
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventType,
    /// Signal id, only meaningful for custom events
    pub id: Option<String>,
    pub payload: Option<Payload>,
}

impl Event {
    pub fn new(kind: EventType) -> Self {
        Self {
            kind,
            id: None,
            payload: None,
        }
    }

    pub fn added(owner: CardHandle) -> Self {
        Self::new(EventType::Added).with_payload(Payload::Owner(owner))
    }

    pub fn removed(owner: CardHandle) -> Self {
        Self::new(EventType::Removed).with_payload(Payload::Owner(owner))
    }

    pub fn tick() -> Self {
        Self::new(EventType::Tick)
    }

    pub fn activate() -> Self {
        Self::new(EventType::Use)
    }

    pub fn custom(id: impl Into<String>) -> Self {
        Self {
            kind: EventType::Custom,
            id: Some(id.into()),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Owner carried by a lifecycle event
    pub fn owner(&self) -> Option<CardHandle> {
        match self.payload {
            Some(Payload::Owner(owner)) => Some(owner),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}({})", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}
