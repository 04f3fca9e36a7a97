//! Rule engine - owns the card tree, the registry, and the rule table
//!
//! All tree mutations go through the engine so that the lifecycle events
//! they raise reach the card's listeners. Event scheduling lives in
//! [`scheduler`].

pub mod registry;
mod scheduler;

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::card::entity::{Card, Listener};
use crate::card::factory::CardFactory;
use crate::card::tree::CardTree;
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{CardHandle, CardKey, ListenerId};
use crate::rules::event::{Event, EventType};
use crate::rules::rule::Rule;

pub use registry::CardRegistry;

/// External listener callback
pub type ListenerFn = Box<dyn FnMut(CardHandle, &Event)>;

/// Intrinsic parts deeper than this are treated as a template cycle
const MAX_PART_DEPTH: usize = 8;

pub struct Engine {
    config: EngineConfig,
    tree: CardTree,
    registry: CardRegistry,
    /// Rules per trigger, in registration order
    rules: AHashMap<EventType, Vec<Arc<Rule>>>,
    rule_count: usize,
    factory: Option<Box<dyn CardFactory>>,
    listeners: AHashMap<ListenerId, ListenerFn>,
    next_listener: u32,
    queue: VecDeque<(CardHandle, Event)>,
    /// Events raised while a `process` call is on the stack
    deferred: VecDeque<(CardHandle, Event)>,
    pumping: bool,
    depth: u32,
    /// Rule failure from the last automatic pump
    pump_error: Option<EngineError>,
    rng: ChaCha8Rng,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            tree: CardTree::new(),
            registry: CardRegistry::new(),
            rules: AHashMap::new(),
            rule_count: 0,
            factory: None,
            listeners: AHashMap::new(),
            next_listener: 0,
            queue: VecDeque::new(),
            deferred: VecDeque::new(),
            pumping: false,
            depth: 0,
            pump_error: None,
            rng,
        }
    }

    pub fn with_factory(mut self, factory: impl CardFactory + 'static) -> Self {
        self.set_factory(Box::new(factory));
        self
    }

    pub fn set_factory(&mut self, factory: Box<dyn CardFactory>) {
        self.factory = Some(factory);
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &CardTree {
        &self.tree
    }

    pub fn card(&self, handle: CardHandle) -> Option<&Card> {
        self.tree.get(handle)
    }

    /// Mutable access to tags and properties; tree links stay engine-managed
    pub fn card_mut(&mut self, handle: CardHandle) -> Option<&mut Card> {
        self.tree.get_mut(handle)
    }

    // ========================================================================
    // Rules
    // ========================================================================

    /// Add a rule to the table
    ///
    /// Fails for malformed rules and for names that are already registered.
    pub fn register_rule(&mut self, rule: Rule) -> Result<()> {
        rule.validate()?;
        let duplicate = self
            .rules
            .values()
            .flatten()
            .any(|existing| existing.name() == rule.name());
        if duplicate {
            return Err(EngineError::DuplicateRule(rule.name().to_string()));
        }

        tracing::debug!("Registered rule '{}' on {}", rule.name(), rule.trigger());
        self.rules
            .entry(rule.trigger())
            .or_default()
            .push(Arc::new(rule));
        self.rule_count += 1;
        Ok(())
    }

    pub fn register_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<()> {
        for rule in rules {
            self.register_rule(rule)?;
        }
        Ok(())
    }

    /// Rules for a trigger, in registration order
    pub fn rules_for(&self, trigger: EventType) -> &[Arc<Rule>] {
        self.rules.get(&trigger).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Build a card through the factory and register it
    ///
    /// Intrinsic parts listed by the factory are built as well and attached
    /// as intrinsic children. Returns `None` without a factory or for an
    /// unknown template id.
    pub fn create_card(&mut self, template_id: &str) -> Result<Option<CardHandle>> {
        self.create_card_nested(template_id, 0)
    }

    fn create_card_nested(
        &mut self,
        template_id: &str,
        depth: usize,
    ) -> Result<Option<CardHandle>> {
        if depth > MAX_PART_DEPTH {
            return Err(EngineError::InvalidTemplate(format!(
                "intrinsic parts of '{}' nest deeper than {}",
                template_id, MAX_PART_DEPTH
            )));
        }
        let Some(factory) = self.factory.as_ref() else {
            return Ok(None);
        };
        let Some(card) = factory.create(template_id) else {
            tracing::debug!("No template '{}' in factory", template_id);
            return Ok(None);
        };
        let parts = factory.intrinsic_parts(template_id);

        let handle = self.add_card(card);
        for part_id in parts {
            if let Some(part) = self.create_card_nested(&part_id, depth + 1)? {
                self.add_child(handle, part, true)?;
            }
        }
        Ok(Some(handle))
    }

    /// Store a new card and register it
    pub fn add_card(&mut self, card: Card) -> CardHandle {
        let handle = self.tree.insert(card);
        self.register(handle);
        handle
    }

    /// Register a card that is in the tree but not in the registry
    ///
    /// The card keeps its previous index when that index is still free.
    /// Returns false if it is already registered.
    pub fn register_card(&mut self, handle: CardHandle) -> Result<bool> {
        if !self.tree.contains(handle) {
            return Err(EngineError::UnknownCard(handle));
        }
        Ok(self.register(handle))
    }

    fn register(&mut self, handle: CardHandle) -> bool {
        if self.registry.contains(handle) {
            return false;
        }
        let Some(card) = self.tree.get(handle) else {
            return false;
        };
        let id = card.id().to_string();
        let index = match card.index() {
            Some(index) if self.registry.is_index_free(&id, index) => index,
            _ => self.registry.allocate_index(&id),
        };

        let key = CardKey::new(id, index);
        tracing::debug!("Registered card {}", key);
        self.registry.insert(key, handle);
        if let Some(card) = self.tree.get_mut(handle) {
            card.set_index(index);
            card.subscribe(Listener::Scheduler);
        }
        true
    }

    /// Drop a card from the registry and stop scheduling its events
    ///
    /// Tree membership is untouched.
    pub fn remove_card(&mut self, handle: CardHandle) -> bool {
        let Some(key) = self.registry.remove(handle) else {
            return false;
        };
        tracing::debug!("Unregistered card {}", key);
        if let Some(card) = self.tree.get_mut(handle) {
            card.unsubscribe(Listener::Scheduler);
        }
        true
    }

    pub fn is_registered(&self, handle: CardHandle) -> bool {
        self.registry.contains(handle)
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    pub fn get_by_key(&self, id: &str, index: u32) -> Option<CardHandle> {
        self.registry.get(id, index)
    }

    pub fn get_all_by_id(&self, id: &str) -> Vec<CardHandle> {
        self.registry.all_by_id(id)
    }

    pub fn get_first_by_id(&self, id: &str) -> Option<CardHandle> {
        self.registry.first_by_id(id)
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Subscribe a callback to a card's events
    ///
    /// Callbacks run synchronously, in subscription order, once per event.
    pub fn subscribe<F>(&mut self, handle: CardHandle, callback: F) -> Result<ListenerId>
    where
        F: FnMut(CardHandle, &Event) + 'static,
    {
        let card = self
            .tree
            .get_mut(handle)
            .ok_or(EngineError::UnknownCard(handle))?;
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        card.subscribe(Listener::External(id));
        self.listeners.insert(id, Box::new(callback));
        Ok(id)
    }

    pub fn unsubscribe(&mut self, handle: CardHandle, id: ListenerId) -> bool {
        let removed = self
            .tree
            .get_mut(handle)
            .map_or(false, |card| card.unsubscribe(Listener::External(id)));
        if removed {
            self.listeners.remove(&id);
        }
        removed
    }

    // ========================================================================
    // Tree
    // ========================================================================

    /// Attach `child` under `parent`, see [`CardTree::add_child`]
    pub fn add_child(
        &mut self,
        parent: CardHandle,
        child: CardHandle,
        intrinsic: bool,
    ) -> Result<()> {
        self.tree.add_child(parent, child, intrinsic)?;
        self.dispatch();
        Ok(())
    }

    /// Detach `child` from `parent`, see [`CardTree::remove_child`]
    pub fn remove_child(
        &mut self,
        parent: CardHandle,
        child: CardHandle,
        force: bool,
    ) -> Result<bool> {
        let removed = self.tree.remove_child(parent, child, force);
        self.dispatch();
        Ok(removed)
    }

    /// Detach a card from its current owner, false if it has none
    pub fn detach(&mut self, child: CardHandle, force: bool) -> Result<bool> {
        let removed = self.tree.detach(child, force);
        self.dispatch();
        Ok(removed)
    }

    pub fn add_tag(&mut self, handle: CardHandle, tag: &str) -> bool {
        self.tree
            .get_mut(handle)
            .map_or(false, |card| card.add_tag(tag))
    }

    pub fn remove_tag(&mut self, handle: CardHandle, tag: &str) -> bool {
        self.tree
            .get_mut(handle)
            .map_or(false, |card| card.remove_tag(tag))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
