//! Card Forge - event-driven rules over a tree of cards
//!
//! Cards own other cards. Attaching, detaching, using and ticking a card
//! raises events, and the [`Engine`] answers each event by running the rules
//! registered for it. Rules check requirements against the card's
//! surroundings and apply effects that create, remove or change cards.

pub mod card;
pub mod core;
pub mod engine;
pub mod rules;

pub use crate::card::{Card, CardCategory, CardFactory, CardTemplate, TemplateCatalog, TemplateFactory};
pub use crate::core::{CardHandle, CardKey, EngineConfig, EngineError, Result};
pub use crate::engine::Engine;
pub use crate::rules::{Effect, Event, EventType, Requirement, Rule, RuleBuilder, TargetSelector};
