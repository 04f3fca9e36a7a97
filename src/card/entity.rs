//! Card - a node in the card tree
//!
//! A card carries its identity, a tag set, named properties, its ordered
//! children, an optional owner, and the listeners subscribed to its events.
//! Tree links are only changed through [`CardTree`](super::tree::CardTree),
//! which keeps owner and children consistent.

use ahash::AHashSet;
use std::collections::BTreeSet;

use super::property::Property;
use super::template::{CardCategory, CardTemplate};
use crate::core::types::{CardHandle, CardKey, ListenerId};

/// Receiver of a card's events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    /// The engine's scheduler subscription
    Scheduler,
    /// A callback registered through the engine
    External(ListenerId),
}

#[derive(Debug, Clone)]
pub struct Card {
    id: String,
    name: String,
    category: CardCategory,
    /// Assigned by the registry, `None` until first registered
    index: Option<u32>,
    tags: BTreeSet<String>,
    properties: Vec<Property>,
    pub(crate) children: Vec<CardHandle>,
    pub(crate) intrinsic: AHashSet<CardHandle>,
    pub(crate) owner: Option<CardHandle>,
    pub(crate) listeners: Vec<Listener>,
}

impl Card {
    /// Create a bare card with no tags or properties
    pub fn new(id: impl Into<String>, category: CardCategory) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            category,
            index: None,
            tags: BTreeSet::new(),
            properties: Vec::new(),
            children: Vec::new(),
            intrinsic: AHashSet::new(),
            owner: None,
            listeners: Vec::new(),
        }
    }

    /// Create a card from template data
    ///
    /// Default tags and properties are copied once; later template edits
    /// never reach existing cards.
    pub fn from_template(template: &CardTemplate) -> Self {
        let mut card = Self::new(template.id.clone(), template.category);
        card.name = template.name.clone();
        card.tags = template.default_tags.iter().cloned().collect();
        card.properties = template
            .properties
            .iter()
            .map(|def| Property::new(def.name.clone(), def.base))
            .collect();
        card
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.add_tag(tag);
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Template id
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> CardCategory {
        self.category
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = Some(index);
    }

    /// Registry key, available once the card has been registered
    pub fn key(&self) -> Option<CardKey> {
        self.index.map(|index| CardKey::new(self.id.clone(), index))
    }

    pub fn owner(&self) -> Option<CardHandle> {
        self.owner
    }

    pub fn children(&self) -> &[CardHandle] {
        &self.children
    }

    pub fn is_intrinsic(&self, child: CardHandle) -> bool {
        self.intrinsic.contains(&child)
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Tags in sorted order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Returns true if the tag was not already present
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Returns true if the tag was present
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name() == name)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut [Property] {
        &mut self.properties
    }

    /// Add a property unless one with the same name exists
    pub fn add_property(&mut self, property: Property) -> bool {
        if self.property(property.name()).is_some() {
            return false;
        }
        self.properties.push(property);
        true
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub(crate) fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub(crate) fn unsubscribe(&mut self, listener: Listener) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| *l != listener);
        self.listeners.len() != before
    }
}
