//! Rule requirements - predicates evaluated before a rule may run
//!
//! Every requirement of a rule must hold. A holding requirement may also
//! contribute cards to the rule's matched set, which effects later read
//! through [`Scope::Matched`](super::selector::Scope::Matched).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::selector::{SelectionContext, TargetSelector};
use crate::card::tree::CardTree;
use crate::core::types::CardHandle;

/// Custom requirement callback
pub type PredicateFn = Arc<dyn Fn(&CardTree, &SelectionContext<'_>) -> bool>;

#[derive(Clone)]
pub struct Predicate(pub PredicateFn);

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Numeric comparison used by property requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Comparison {
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Eq => approx_eq(lhs, rhs),
            Comparison::Ne => !approx_eq(lhs, rhs),
            Comparison::Ge => lhs >= rhs,
            Comparison::Gt => lhs > rhs,
        }
    }
}

/// Equality within one epsilon scaled to the larger operand, never tighter than
/// an absolute epsilon near zero
fn approx_eq(lhs: f64, rhs: f64) -> bool {
    let scale = lhs.abs().max(rhs.abs()).max(1.0);
    (lhs - rhs).abs() <= f64::EPSILON * scale
}

fn default_min() -> usize {
    1
}

fn default_collect() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// Number of selected cards lies within `[min, max]`
    Select {
        #[serde(default)]
        selector: TargetSelector,
        #[serde(default = "default_min")]
        min: usize,
        #[serde(default)]
        max: Option<usize>,
        /// Add the selected cards to the matched set
        #[serde(default = "default_collect")]
        collect: bool,
    },
    /// Some selected card has a property whose effective value compares true
    Property {
        #[serde(default)]
        selector: TargetSelector,
        name: String,
        comparison: Comparison,
        value: f64,
    },
    /// Holds with the given probability, rolled on the engine RNG
    Chance { probability: f64 },
    /// Holds when the inner requirement fails
    Not { requirement: Box<Requirement> },
    #[serde(skip)]
    Predicate(Predicate),
}

impl Requirement {
    /// At least one selected card, collected into the matched set
    pub fn has(selector: TargetSelector) -> Self {
        Self::count(selector, 1, None)
    }

    pub fn count(selector: TargetSelector, min: usize, max: Option<usize>) -> Self {
        Requirement::Select {
            selector,
            min,
            max,
            collect: true,
        }
    }

    /// No selected card
    pub fn absent(selector: TargetSelector) -> Self {
        Requirement::Select {
            selector,
            min: 0,
            max: Some(0),
            collect: false,
        }
    }

    pub fn property(
        selector: TargetSelector,
        name: impl Into<String>,
        comparison: Comparison,
        value: f64,
    ) -> Self {
        Requirement::Property {
            selector,
            name: name.into(),
            comparison,
            value,
        }
    }

    pub fn chance(probability: f64) -> Self {
        Requirement::Chance { probability }
    }

    pub fn not(requirement: Requirement) -> Self {
        Requirement::Not {
            requirement: Box::new(requirement),
        }
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&CardTree, &SelectionContext<'_>) -> bool + 'static,
    {
        Requirement::Predicate(Predicate(Arc::new(f)))
    }

    /// Evaluate against the tree
    ///
    /// Returns `None` when the requirement fails, otherwise the cards it
    /// contributes to the matched set (possibly none).
    pub fn evaluate<R: Rng>(
        &self,
        tree: &CardTree,
        ctx: &SelectionContext<'_>,
        rng: &mut R,
    ) -> Option<Vec<CardHandle>> {
        match self {
            Requirement::Select {
                selector,
                min,
                max,
                collect,
            } => {
                let selected = selector.select(tree, ctx);
                let count = selected.len();
                if count < *min || max.map_or(false, |max| count > max) {
                    return None;
                }
                Some(if *collect { selected } else { Vec::new() })
            }
            Requirement::Property {
                selector,
                name,
                comparison,
                value,
            } => {
                let passing: Vec<CardHandle> = selector
                    .select(tree, ctx)
                    .into_iter()
                    .filter(|&h| {
                        tree.get(h)
                            .and_then(|card| card.property(name))
                            .map_or(false, |p| comparison.compare(p.value(), *value))
                    })
                    .collect();
                (!passing.is_empty()).then_some(passing)
            }
            Requirement::Chance { probability } => rng
                .gen_bool(probability.clamp(0.0, 1.0))
                .then(Vec::new),
            Requirement::Not { requirement } => {
                requirement.evaluate(tree, ctx, rng).is_none().then(Vec::new)
            }
            Requirement::Predicate(Predicate(f)) => f(tree, ctx).then(Vec::new),
        }
    }

    /// Structural check run at rule registration
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Requirement::Chance { probability } if !(0.0..=1.0).contains(probability) => {
                Err(format!("chance probability {} is outside [0, 1]", probability))
            }
            Requirement::Select {
                min,
                max: Some(max),
                ..
            } if max < min => Err(format!("select bounds [{}, {}] are empty", min, max)),
            Requirement::Not { requirement } => requirement.validate(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::entity::Card;
    use crate::card::property::Property;
    use crate::card::template::CardCategory;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (CardTree, CardHandle, CardHandle, CardHandle) {
        let mut tree = CardTree::new();
        let forge = tree.insert(Card::new("forge", CardCategory::Structure));
        let coal = tree.insert(
            Card::new("coal", CardCategory::Resource)
                .with_tag("fuel")
                .with_property(Property::new("heat", 8.0)),
        );
        let ore = tree.insert(
            Card::new("ore", CardCategory::Resource).with_property(Property::new("heat", 1.0)),
        );
        tree.add_child(forge, coal, false).unwrap();
        tree.add_child(forge, ore, false).unwrap();
        (tree, forge, coal, ore)
    }

    fn ctx(container: CardHandle) -> SelectionContext<'static> {
        SelectionContext {
            source: container,
            container,
            matched: &[],
            max_depth: None,
        }
    }

    #[test]
    fn test_has_collects_selection() {
        let (tree, forge, coal, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let req = Requirement::has(TargetSelector::children().tagged("fuel"));
        assert_eq!(req.evaluate(&tree, &ctx(forge), &mut rng), Some(vec![coal]));

        let missing = Requirement::has(TargetSelector::children().tagged("wood"));
        assert_eq!(missing.evaluate(&tree, &ctx(forge), &mut rng), None);
    }

    #[test]
    fn test_count_bounds() {
        let (tree, forge, _, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let two = Requirement::count(TargetSelector::children(), 2, Some(2));
        assert!(two.evaluate(&tree, &ctx(forge), &mut rng).is_some());

        let at_most_one = Requirement::count(TargetSelector::children(), 0, Some(1));
        assert!(at_most_one.evaluate(&tree, &ctx(forge), &mut rng).is_none());
    }

    #[test]
    fn test_absent() {
        let (tree, forge, _, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let no_wood = Requirement::absent(TargetSelector::children().tagged("wood"));
        assert_eq!(no_wood.evaluate(&tree, &ctx(forge), &mut rng), Some(vec![]));

        let no_fuel = Requirement::absent(TargetSelector::children().tagged("fuel"));
        assert_eq!(no_fuel.evaluate(&tree, &ctx(forge), &mut rng), None);
    }

    #[test]
    fn test_property_comparison() {
        let (tree, forge, coal, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let hot = Requirement::property(TargetSelector::children(), "heat", Comparison::Ge, 5.0);
        assert_eq!(hot.evaluate(&tree, &ctx(forge), &mut rng), Some(vec![coal]));

        // Missing property never matches
        let wet = Requirement::property(TargetSelector::children(), "moisture", Comparison::Ge, 0.0);
        assert_eq!(wet.evaluate(&tree, &ctx(forge), &mut rng), None);
    }

    #[test]
    fn test_equality_scales_with_magnitude() {
        // Accumulated rounding on large values still compares equal
        assert!(Comparison::Eq.compare((0.1 + 0.2) * 1e6, 300_000.0));
        assert!(Comparison::Eq.compare(100.0 * 1.1, 110.0));
        assert!(!Comparison::Ne.compare(100.0 * 1.1, 110.0));
        assert!(Comparison::Eq.compare(0.1 + 0.2, 0.3));

        assert!(!Comparison::Eq.compare(1e6, 1e6 + 1.0));
        assert!(Comparison::Ne.compare(1e6, 1e6 + 1.0));
        assert!(!Comparison::Eq.compare(0.0, 1e-9));
    }

    #[test]
    fn test_not_inverts() {
        let (tree, forge, _, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let req = Requirement::not(Requirement::has(TargetSelector::children().tagged("fuel")));
        assert_eq!(req.evaluate(&tree, &ctx(forge), &mut rng), None);

        let req = Requirement::not(Requirement::has(TargetSelector::children().tagged("wood")));
        assert_eq!(req.evaluate(&tree, &ctx(forge), &mut rng), Some(vec![]));
    }

    #[test]
    fn test_chance_extremes() {
        let (tree, forge, _, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..32 {
            assert!(Requirement::chance(1.0).evaluate(&tree, &ctx(forge), &mut rng).is_some());
            assert!(Requirement::chance(0.0).evaluate(&tree, &ctx(forge), &mut rng).is_none());
        }
    }

    #[test]
    fn test_predicate() {
        let (tree, forge, _, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let req = Requirement::predicate(|tree, ctx| tree.children(ctx.container).len() == 2);
        assert!(req.evaluate(&tree, &ctx(forge), &mut rng).is_some());
    }

    #[test]
    fn test_validate() {
        assert!(Requirement::chance(0.5).validate().is_ok());
        assert!(Requirement::chance(1.5).validate().is_err());
        assert!(Requirement::chance(f64::NAN).validate().is_err());
        assert!(Requirement::not(Requirement::chance(-0.1)).validate().is_err());
        assert!(Requirement::count(TargetSelector::children(), 3, Some(1))
            .validate()
            .is_err());
    }

    #[test]
    fn test_requirement_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            requirements: Vec<Requirement>,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
[[requirements]]
kind = "select"
selector = { scope = "children", filter = { tag = "fuel" } }

[[requirements]]
kind = "chance"
probability = 0.25
"#,
        )
        .unwrap();
        assert!(matches!(
            parsed.requirements[0],
            Requirement::Select { min: 1, max: None, collect: true, .. }
        ));
        assert!(matches!(parsed.requirements[1], Requirement::Chance { .. }));
    }
}
