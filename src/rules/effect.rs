//! Rule effects - mutations applied when a rule runs
//!
//! Effects never fail for "nothing to do": an empty selection, a missing
//! factory, an unknown template or an absent property are all no-ops. Only
//! tree invariant violations come back as errors.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use super::rule::RuleContext;
use super::selector::TargetSelector;
use crate::card::property::{Modifier, Property};
use crate::core::error::Result;
use crate::core::types::CardHandle;
use crate::engine::Engine;

/// Custom effect callback, receives the rule context and its matched set
pub type InvokeFn = Arc<dyn Fn(&mut Engine, &RuleContext, &[CardHandle]) -> Result<()>>;

#[derive(Clone)]
pub struct Invoke(pub InvokeFn);

impl fmt::Debug for Invoke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invoke(..)")
    }
}

/// Change applied to a matching property
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyOp {
    AddModifier(Modifier),
    /// Remove the modifier with this source
    RemoveModifier(String),
    /// Add a delta to the base value
    AddBase(f64),
    SetBase(f64),
}

impl PropertyOp {
    pub fn apply(&self, property: &mut Property) {
        match self {
            PropertyOp::AddModifier(modifier) => property.add_modifier(modifier.clone()),
            PropertyOp::RemoveModifier(source) => {
                property.remove_modifier(source);
            }
            PropertyOp::AddBase(delta) => {
                property.set_base_value(property.get_base_value() + delta)
            }
            PropertyOp::SetBase(value) => property.set_base_value(*value),
        }
    }
}

fn default_count() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Build `count` copies of each template and attach them to the container
    Create {
        templates: Vec<String>,
        #[serde(default = "default_count")]
        count: usize,
    },
    /// Detach targets from their owners, intrinsic targets stay
    Remove {
        #[serde(default)]
        selector: TargetSelector,
    },
    /// Change properties on targets, all of them when `property` is unset
    ModifyProperty {
        #[serde(default)]
        selector: TargetSelector,
        #[serde(default)]
        property: Option<String>,
        operation: PropertyOp,
    },
    AddTag {
        #[serde(default)]
        selector: TargetSelector,
        tag: String,
    },
    RemoveTag {
        #[serde(default)]
        selector: TargetSelector,
        tag: String,
    },
    /// Raise a custom event on each target
    Signal {
        #[serde(default)]
        selector: TargetSelector,
        id: String,
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    #[serde(skip)]
    Invoke(Invoke),
}

impl Effect {
    pub fn create(template: impl Into<String>, count: usize) -> Self {
        Effect::Create {
            templates: vec![template.into()],
            count,
        }
    }

    pub fn remove(selector: TargetSelector) -> Self {
        Effect::Remove { selector }
    }

    pub fn modify_property(
        selector: TargetSelector,
        property: Option<&str>,
        operation: PropertyOp,
    ) -> Self {
        Effect::ModifyProperty {
            selector,
            property: property.map(str::to_string),
            operation,
        }
    }

    pub fn add_tag(selector: TargetSelector, tag: impl Into<String>) -> Self {
        Effect::AddTag {
            selector,
            tag: tag.into(),
        }
    }

    pub fn remove_tag(selector: TargetSelector, tag: impl Into<String>) -> Self {
        Effect::RemoveTag {
            selector,
            tag: tag.into(),
        }
    }

    pub fn signal(selector: TargetSelector, id: impl Into<String>) -> Self {
        Effect::Signal {
            selector,
            id: id.into(),
            payload: None,
        }
    }

    pub fn invoke<F>(f: F) -> Self
    where
        F: Fn(&mut Engine, &RuleContext, &[CardHandle]) -> Result<()> + 'static,
    {
        Effect::Invoke(Invoke(Arc::new(f)))
    }

    /// Apply the effect for a rule that has matched
    pub fn apply(&self, engine: &mut Engine, ctx: &RuleContext) -> Result<()> {
        match self {
            Effect::Create { templates, count } => {
                if !engine.has_factory() {
                    tracing::debug!("Rule '{}' skipped create: no factory", ctx.rule);
                    return Ok(());
                }
                for template_id in templates {
                    for _ in 0..*count {
                        if let Some(card) = engine.create_card(template_id)? {
                            engine.add_child(ctx.container, card, false)?;
                        }
                    }
                }
            }
            Effect::Remove { selector } => {
                for target in select(engine, selector, ctx) {
                    engine.detach(target, false)?;
                }
            }
            Effect::ModifyProperty {
                selector,
                property,
                operation,
            } => {
                for target in select(engine, selector, ctx) {
                    let Some(card) = engine.card_mut(target) else {
                        continue;
                    };
                    for prop in card.properties_mut() {
                        if property.as_deref().map_or(true, |name| prop.name() == name) {
                            operation.apply(prop);
                        }
                    }
                }
            }
            Effect::AddTag { selector, tag } => {
                if tag.is_empty() {
                    return Ok(());
                }
                for target in select(engine, selector, ctx) {
                    engine.add_tag(target, tag);
                }
            }
            Effect::RemoveTag { selector, tag } => {
                for target in select(engine, selector, ctx) {
                    engine.remove_tag(target, tag);
                }
            }
            Effect::Signal {
                selector,
                id,
                payload,
            } => {
                for target in select(engine, selector, ctx) {
                    engine.signal(target, id, payload.clone())?;
                }
            }
            Effect::Invoke(Invoke(f)) => f(engine, ctx, &ctx.matched)?,
        }
        Ok(())
    }
}

/// Resolve a selector against the live tree and the rule's matched snapshot
fn select(engine: &Engine, selector: &TargetSelector, ctx: &RuleContext) -> Vec<CardHandle> {
    selector.select(engine.tree(), &ctx.selection())
}
