//! Rules - trigger, requirements, and effects bundled together
//!
//! A rule is immutable once built. The engine stores rules behind `Arc` and
//! evaluates them in two phases: every candidate rule for an event gathers
//! its matches against the same tree, then the matching rules execute.

use ahash::AHashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effect::Effect;
use super::event::{Event, EventType};
use super::requirement::Requirement;
use super::selector::SelectionContext;
use crate::card::tree::CardTree;
use crate::core::error::{EngineError, Result};
use crate::core::types::CardHandle;
use crate::engine::Engine;

/// Per-rule behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulePolicy {
    /// Drop repeated cards from the matched set, keeping first occurrences
    pub distinct_matched: bool,
    /// Skip the remaining rules for this event after this one runs
    pub stop_on_success: bool,
}

/// Everything an effect needs to know about the match it runs for
#[derive(Debug, Clone)]
pub struct RuleContext {
    /// Name of the executing rule
    pub rule: String,
    pub event: Event,
    pub source: CardHandle,
    pub container: CardHandle,
    /// Cards gathered by the requirements, before any effect ran
    pub matched: Vec<CardHandle>,
    pub max_depth: Option<usize>,
}

impl RuleContext {
    pub fn selection(&self) -> SelectionContext<'_> {
        SelectionContext {
            source: self.source,
            container: self.container,
            matched: &self.matched,
            max_depth: self.max_depth,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    name: String,
    trigger: EventType,
    /// Only custom events with this id trigger the rule
    #[serde(default)]
    custom_id: Option<String>,
    /// Owner hops from the source to the container, negative for the root
    #[serde(default)]
    container_distance: i32,
    #[serde(default)]
    max_depth: Option<usize>,
    /// Lower runs earlier
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    requirements: Vec<Requirement>,
    #[serde(default)]
    effects: Vec<Effect>,
    #[serde(default)]
    policy: RulePolicy,
}

impl Rule {
    pub fn builder(name: impl Into<String>, trigger: EventType) -> RuleBuilder {
        RuleBuilder::new(name, trigger)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> EventType {
        self.trigger
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.custom_id.as_deref()
    }

    pub fn container_distance(&self) -> i32 {
        self.container_distance
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn policy(&self) -> RulePolicy {
        self.policy
    }

    /// Whether this rule listens to the event
    pub fn accepts(&self, event: &Event) -> bool {
        if event.kind != self.trigger {
            return false;
        }
        match (&self.custom_id, event.kind) {
            (Some(expected), EventType::Custom) => event.id.as_deref() == Some(expected.as_str()),
            _ => true,
        }
    }

    /// Structural checks run at registration
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| EngineError::InvalidRule {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("rule name is empty".into()));
        }
        if self.custom_id.is_some() && self.trigger != EventType::Custom {
            return Err(invalid(format!(
                "custom id filter on a {} trigger",
                self.trigger
            )));
        }
        for requirement in &self.requirements {
            requirement.validate().map_err(invalid)?;
        }
        Ok(())
    }

    /// Evaluate every requirement against the tree
    ///
    /// Returns the context the effects will run with, or `None` if any
    /// requirement fails. Requirements see the cards gathered by earlier
    /// requirements through the matched scope.
    pub fn gather<R: Rng>(
        &self,
        tree: &CardTree,
        source: CardHandle,
        event: &Event,
        rng: &mut R,
    ) -> Option<RuleContext> {
        let container = tree.resolve_container(source, self.container_distance);
        let mut matched = Vec::new();

        for requirement in &self.requirements {
            let selection = SelectionContext {
                source,
                container,
                matched: &matched,
                max_depth: self.max_depth,
            };
            let found = requirement.evaluate(tree, &selection, rng)?;
            matched.extend(found);
        }

        if self.policy.distinct_matched {
            let mut seen = AHashSet::new();
            matched.retain(|h| seen.insert(*h));
        }

        Some(RuleContext {
            rule: self.name.clone(),
            event: event.clone(),
            source,
            container,
            matched,
            max_depth: self.max_depth,
        })
    }

    /// Run every effect in declared order
    pub fn execute(&self, engine: &mut Engine, ctx: &RuleContext) -> Result<()> {
        for effect in &self.effects {
            effect.apply(engine, ctx)?;
        }
        Ok(())
    }
}

/// Accumulates rule parts into an immutable [`Rule`]
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    pub fn new(name: impl Into<String>, trigger: EventType) -> Self {
        Self {
            rule: Rule {
                name: name.into(),
                trigger,
                custom_id: None,
                container_distance: 0,
                max_depth: None,
                priority: 0,
                requirements: Vec::new(),
                effects: Vec::new(),
                policy: RulePolicy::default(),
            },
        }
    }

    pub fn custom_id(mut self, id: impl Into<String>) -> Self {
        self.rule.custom_id = Some(id.into());
        self
    }

    pub fn container_distance(mut self, distance: i32) -> Self {
        self.rule.container_distance = distance;
        self
    }

    /// Use the root of the source's tree as container
    pub fn root_container(self) -> Self {
        self.container_distance(-1)
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.rule.max_depth = Some(depth);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.rule.priority = priority;
        self
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        self.rule.requirements.push(requirement);
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.rule.effects.push(effect);
        self
    }

    pub fn distinct_matched(mut self) -> Self {
        self.rule.policy.distinct_matched = true;
        self
    }

    pub fn stop_on_success(mut self) -> Self {
        self.rule.policy.stop_on_success = true;
        self
    }

    pub fn build(self) -> Rule {
        self.rule
    }
}
