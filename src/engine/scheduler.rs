//! Event scheduling - queueing, pumping, and rule processing
//!
//! Events raised outside of rule processing go to the main queue. Events
//! raised while a `process` call is on the stack go to the deferred queue
//! and move to the end of the main queue once the outermost `process`
//! returns. A rule's own effects therefore never interleave with its
//! matching, and chained triggers drain breadth-first instead of recursing.

use std::sync::Arc;

use super::Engine;
use crate::card::entity::Listener;
use crate::core::config::{ExecutionMode, RuleSelection};
use crate::core::error::{EngineError, Result};
use crate::core::types::CardHandle;
use crate::rules::event::{Event, Payload};
use crate::rules::rule::{Rule, RuleContext};

impl Engine {
    // ========================================================================
    // Raising events
    // ========================================================================

    /// Raise an event on a card and deliver it to the card's listeners
    pub fn raise(&mut self, source: CardHandle, event: Event) -> Result<()> {
        if !self.tree.contains(source) {
            return Err(EngineError::UnknownCard(source));
        }
        self.tree.emit(source, event);
        self.dispatch();
        Ok(())
    }

    /// Manually activate a card
    pub fn use_card(&mut self, source: CardHandle) -> Result<()> {
        self.raise(source, Event::activate())
    }

    pub fn tick_card(&mut self, source: CardHandle) -> Result<()> {
        self.raise(source, Event::tick())
    }

    /// Raise a tick on every registered card, in handle order
    pub fn tick_all(&mut self) -> Result<()> {
        for handle in self.registry.handles() {
            self.tree.emit(handle, Event::tick());
        }
        self.dispatch();
        Ok(())
    }

    /// Raise a custom event with an optional payload
    pub fn signal(
        &mut self,
        source: CardHandle,
        id: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut event = Event::custom(id);
        event.payload = payload.map(Payload::Value);
        self.raise(source, event)
    }

    /// Deliver every event waiting in the tree's outbox
    ///
    /// Listeners run in subscription order. When nothing is being processed
    /// and auto-pump is enabled, the queue is drained afterwards. A rule that
    /// fails during that drain does not fail the call that raised the event;
    /// the error is logged and kept for [`Engine::take_pump_error`].
    pub(super) fn dispatch(&mut self) {
        let emitted = self.tree.drain_emitted();
        if emitted.is_empty() {
            return;
        }

        for (source, event) in emitted {
            let Some(card) = self.tree.get(source) else {
                continue;
            };
            for listener in card.listeners().to_vec() {
                match listener {
                    Listener::Scheduler => self.enqueue(source, event.clone()),
                    Listener::External(id) => {
                        if let Some(callback) = self.listeners.get_mut(&id) {
                            callback(source, &event);
                        }
                    }
                }
            }
        }

        if self.config.auto_pump && !self.pumping && self.depth == 0 {
            if let Err(e) = self.pump(self.config.max_events_per_pump) {
                tracing::warn!("Rule failed during automatic pump: {}", e);
                self.pump_error = Some(e);
            }
        }
    }

    /// Take the last rule error raised while auto-pumping, if any
    pub fn take_pump_error(&mut self) -> Option<EngineError> {
        self.pump_error.take()
    }

    fn enqueue(&mut self, source: CardHandle, event: Event) {
        if self.depth > 0 {
            tracing::trace!("Deferred {} from {:?}", event, source);
            self.deferred.push_back((source, event));
        } else {
            tracing::trace!("Queued {} from {:?}", event, source);
            self.queue.push_back((source, event));
        }
    }

    // ========================================================================
    // Pump
    // ========================================================================

    /// Drain up to `max_events` queued events
    ///
    /// Only one pump runs at a time; nested calls, including calls made
    /// from inside rule processing, return `Ok(0)`. Hitting the cap logs a
    /// warning and leaves the remaining events queued for the next call.
    /// Returns the number of events processed.
    pub fn pump(&mut self, max_events: usize) -> Result<usize> {
        if self.pumping || self.depth > 0 {
            return Ok(0);
        }
        self.pumping = true;

        let mut processed = 0;
        let mut result = Ok(());
        while processed < max_events {
            let Some((source, event)) = self.queue.pop_front() else {
                break;
            };
            processed += 1;
            if let Err(e) = self.process(source, &event) {
                result = Err(e);
                break;
            }
        }

        if result.is_ok() && !self.queue.is_empty() {
            tracing::warn!(
                "Event cap of {} reached with {} events still queued, a rule may be re-triggering itself",
                max_events,
                self.queue.len()
            );
        }

        self.pumping = false;
        result.map(|_| processed)
    }

    /// Drain the queue using the configured event cap
    pub fn pump_all(&mut self) -> Result<usize> {
        self.pump(self.config.max_events_per_pump)
    }

    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    pub fn deferred_events(&self) -> usize {
        self.deferred.len()
    }

    /// True while a `process` call is on the stack
    pub fn is_processing(&self) -> bool {
        self.depth > 0
    }

    // ========================================================================
    // Process
    // ========================================================================

    /// Run the rules for one event
    ///
    /// Events raised by the rules' effects are deferred. When the outermost
    /// call returns, deferred events move to the end of the main queue, on
    /// success and on error alike.
    pub fn process(&mut self, source: CardHandle, event: &Event) -> Result<()> {
        self.depth += 1;
        let result = self.run_rules(source, event);
        self.depth -= 1;

        if self.depth == 0 && !self.deferred.is_empty() {
            tracing::trace!("Flushing {} deferred events", self.deferred.len());
            let deferred = std::mem::take(&mut self.deferred);
            self.queue.extend(deferred);
        }
        result
    }

    fn run_rules(&mut self, source: CardHandle, event: &Event) -> Result<()> {
        let candidates: Vec<Arc<Rule>> = self
            .rules_for(event.kind)
            .iter()
            .filter(|rule| rule.accepts(event))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        // Every candidate is matched against the same tree before any runs
        let mut matches: Vec<(Arc<Rule>, RuleContext)> = Vec::new();
        for rule in candidates {
            if let Some(ctx) = rule.gather(&self.tree, source, event, &mut self.rng) {
                matches.push((rule, ctx));
            }
        }

        if self.config.rule_selection == RuleSelection::Priority {
            matches.sort_by_key(|(rule, _)| rule.priority());
        }
        if self.config.execution == ExecutionMode::FirstMatch {
            matches.truncate(1);
        }

        for (rule, ctx) in matches {
            tracing::debug!(
                "Rule '{}' fired on {} from {:?} with {} matched",
                rule.name(),
                event,
                source,
                ctx.matched.len()
            );
            rule.execute(self, &ctx)?;
            if rule.policy().stop_on_success {
                tracing::debug!("Rule '{}' stopped {}", rule.name(), event);
                break;
            }
        }
        Ok(())
    }
}
