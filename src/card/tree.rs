//! Card tree - arena storage and ownership links
//!
//! Every card lives in the arena for the lifetime of the tree and is
//! addressed by [`CardHandle`]. Ownership forms a forest: a card has at most
//! one owner and never reaches itself through owner links.
//!
//! Tree mutations raise lifecycle events on the affected card. Events are
//! collected in an outbox which the engine drains and delivers to the card's
//! listeners right after the mutation returns.

use super::entity::Card;
use crate::core::error::{EngineError, Result};
use crate::core::types::CardHandle;
use crate::rules::event::Event;

#[derive(Debug, Default)]
pub struct CardTree {
    cards: Vec<Card>,
    outbox: Vec<(CardHandle, Event)>,
}

impl CardTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a card and return its handle
    pub fn insert(&mut self, card: Card) -> CardHandle {
        let handle = CardHandle(self.cards.len() as u32);
        self.cards.push(card);
        handle
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, handle: CardHandle) -> bool {
        handle.index() < self.cards.len()
    }

    pub fn get(&self, handle: CardHandle) -> Option<&Card> {
        self.cards.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: CardHandle) -> Option<&mut Card> {
        self.cards.get_mut(handle.index())
    }

    /// All handles in insertion order
    pub fn handles(&self) -> impl Iterator<Item = CardHandle> {
        (0..self.cards.len() as u32).map(CardHandle)
    }

    pub fn owner(&self, handle: CardHandle) -> Option<CardHandle> {
        self.get(handle).and_then(|c| c.owner)
    }

    /// Direct children, empty for unknown handles
    pub fn children(&self, handle: CardHandle) -> &[CardHandle] {
        self.get(handle).map(|c| c.children.as_slice()).unwrap_or(&[])
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Attach `child` under `parent`
    ///
    /// Fails if either card is unknown, if `child` already has an owner, if
    /// `child == parent`, or if `child` is an ancestor of `parent`. On success
    /// an added event carrying `parent` is raised on the child.
    pub fn add_child(
        &mut self,
        parent: CardHandle,
        child: CardHandle,
        intrinsic: bool,
    ) -> Result<()> {
        if !self.contains(parent) {
            return Err(EngineError::UnknownCard(parent));
        }
        let child_card = self.get(child).ok_or(EngineError::UnknownCard(child))?;
        if child == parent {
            return Err(EngineError::SelfOwnership(child));
        }
        if let Some(owner) = child_card.owner {
            return Err(EngineError::AlreadyOwned { child, owner });
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(EngineError::OwnershipCycle { child, parent });
        }

        let parent_card = &mut self.cards[parent.index()];
        parent_card.children.push(child);
        if intrinsic {
            parent_card.intrinsic.insert(child);
        }
        self.cards[child.index()].owner = Some(parent);

        self.emit(child, Event::added(parent));
        Ok(())
    }

    /// Detach `child` from `parent`
    ///
    /// Returns false if `child` is not a child of `parent`, or if it is
    /// intrinsic and `force` is not set. On success a removed event carrying
    /// the old owner is raised on the child.
    pub fn remove_child(&mut self, parent: CardHandle, child: CardHandle, force: bool) -> bool {
        let Some(parent_card) = self.cards.get_mut(parent.index()) else {
            return false;
        };
        let Some(position) = parent_card.children.iter().position(|&c| c == child) else {
            return false;
        };
        if parent_card.intrinsic.contains(&child) && !force {
            return false;
        }

        parent_card.children.remove(position);
        parent_card.intrinsic.remove(&child);
        self.emit(child, Event::removed(parent));
        self.cards[child.index()].owner = None;
        true
    }

    /// Detach a card from whatever owns it
    pub fn detach(&mut self, child: CardHandle, force: bool) -> bool {
        match self.owner(child) {
            Some(owner) => self.remove_child(owner, child, force),
            None => false,
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Queue an event raised by `source` for delivery to its listeners
    pub fn emit(&mut self, source: CardHandle, event: Event) {
        let listened = self
            .get(source)
            .map(|c| !c.listeners.is_empty())
            .unwrap_or(false);
        if listened {
            self.outbox.push((source, event));
        }
    }

    /// Take every event raised since the last drain, in emission order
    pub fn drain_emitted(&mut self) -> Vec<(CardHandle, Event)> {
        std::mem::take(&mut self.outbox)
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Owners of `handle`, nearest first
    pub fn ancestors(&self, handle: CardHandle) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.owner(handle),
        }
    }

    /// Top of the ownership chain (the card itself when it has no owner)
    pub fn root_of(&self, handle: CardHandle) -> CardHandle {
        self.ancestors(handle).last().unwrap_or(handle)
    }

    /// Resolve a rule's container relative to the event source
    ///
    /// Distance 0 is the source itself, a positive distance walks that many
    /// owner links (stopping at the root), a negative distance walks to the
    /// root.
    pub fn resolve_container(&self, source: CardHandle, distance: i32) -> CardHandle {
        if distance < 0 {
            return self.root_of(source);
        }
        let mut current = source;
        for _ in 0..distance {
            match self.owner(current) {
                Some(owner) => current = owner,
                None => break,
            }
        }
        current
    }

    /// Pre-order descendants of `root`, excluding `root`
    ///
    /// Depth 1 is the direct children. Each child is followed immediately by
    /// its own subtree, children in declared order.
    pub fn descendants(&self, root: CardHandle, max_depth: Option<usize>) -> Vec<CardHandle> {
        let mut result = Vec::new();
        if max_depth == Some(0) {
            return result;
        }

        let mut stack: Vec<(CardHandle, usize)> =
            self.children(root).iter().rev().map(|&c| (c, 1)).collect();

        while let Some((handle, depth)) = stack.pop() {
            result.push(handle);
            if max_depth.map_or(true, |max| depth < max) {
                stack.extend(self.children(handle).iter().rev().map(|&c| (c, depth + 1)));
            }
        }
        result
    }
}

/// Iterator over a card's owners
pub struct Ancestors<'a> {
    tree: &'a CardTree,
    next: Option<CardHandle>,
}

impl Iterator for Ancestors<'_> {
    type Item = CardHandle;

    fn next(&mut self) -> Option<CardHandle> {
        let current = self.next?;
        self.next = self.tree.owner(current);
        Some(current)
    }
}
