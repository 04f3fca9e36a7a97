//! Rule layer - events, selection, requirements, effects

pub mod effect;
pub mod event;
pub mod requirement;
pub mod rule;
pub mod selector;
mod loader;

pub use effect::{Effect, Invoke, InvokeFn, PropertyOp};
pub use event::{Event, EventType, Payload};
pub use loader::{load_rules, parse_rules_toml};
pub use requirement::{Comparison, Predicate, PredicateFn, Requirement};
pub use rule::{Rule, RuleBuilder, RuleContext, RulePolicy};
pub use selector::{Filter, Scope, SelectionContext, TargetSelector};
