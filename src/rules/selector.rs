//! Target selection shared by requirements and effects
//!
//! A selector picks a scope relative to the rule's container, filters it,
//! and optionally truncates the result to its first entries. Results keep
//! a deterministic order: children in declared order, descendants in
//! pre-order, matched cards in the order they were gathered.

use serde::{Deserialize, Serialize};

use crate::card::entity::Card;
use crate::card::template::CardCategory;
use crate::card::tree::CardTree;
use crate::core::types::CardHandle;

/// Where a selector looks for cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Cards gathered by the rule's requirements
    #[default]
    Matched,
    /// Direct children of the container
    Children,
    /// Everything below the container, bounded by the search depth
    Descendants,
    /// The card that raised the event
    Source,
    /// The resolved container itself
    Container,
}

/// Predicate applied after scope selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    None,
    Tag(String),
    Id(String),
    /// Category name, parsed when the filter runs
    Category(String),
}

/// A filter ready to test cards
enum CompiledFilter<'a> {
    All,
    Tag(&'a str),
    Id(&'a str),
    Category(CardCategory),
}

impl CompiledFilter<'_> {
    fn accepts(&self, card: &Card) -> bool {
        match self {
            CompiledFilter::All => true,
            CompiledFilter::Tag(tag) => card.has_tag(tag),
            CompiledFilter::Id(id) => card.id() == *id,
            CompiledFilter::Category(category) => card.category() == *category,
        }
    }
}

impl Filter {
    /// `None` when the filter value is empty or unparseable
    fn compile(&self) -> Option<CompiledFilter<'_>> {
        match self {
            Filter::None => Some(CompiledFilter::All),
            Filter::Tag(tag) if !tag.is_empty() => Some(CompiledFilter::Tag(tag)),
            Filter::Id(id) if !id.is_empty() => Some(CompiledFilter::Id(id)),
            Filter::Category(name) => name.parse().ok().map(CompiledFilter::Category),
            _ => None,
        }
    }

    /// Test a single card, false for empty or unparseable filters
    pub fn matches(&self, card: &Card) -> bool {
        self.compile().map_or(false, |f| f.accepts(card))
    }
}

/// Inputs a selector resolves against
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub source: CardHandle,
    pub container: CardHandle,
    pub matched: &'a [CardHandle],
    /// Rule-level search depth, used when the selector sets none
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSelector {
    pub scope: Scope,
    pub filter: Filter,
    /// Keep only the first N filtered cards
    pub take: Option<usize>,
    /// Overrides the rule's search depth for descendant scopes
    pub max_depth: Option<usize>,
}

impl TargetSelector {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    pub fn matched() -> Self {
        Self::new(Scope::Matched)
    }

    pub fn children() -> Self {
        Self::new(Scope::Children)
    }

    pub fn descendants() -> Self {
        Self::new(Scope::Descendants)
    }

    pub fn source() -> Self {
        Self::new(Scope::Source)
    }

    pub fn container() -> Self {
        Self::new(Scope::Container)
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.filter = Filter::Tag(tag.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.filter = Filter::Id(id.into());
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.filter = Filter::Category(category.into());
        self
    }

    pub fn take(mut self, count: usize) -> Self {
        self.take = Some(count);
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Resolve the scope, apply the filter, then truncate
    pub fn select(&self, tree: &CardTree, ctx: &SelectionContext<'_>) -> Vec<CardHandle> {
        let Some(filter) = self.filter.compile() else {
            return Vec::new();
        };

        let candidates = match self.scope {
            Scope::Matched => ctx.matched.to_vec(),
            Scope::Children => tree.children(ctx.container).to_vec(),
            Scope::Descendants => {
                tree.descendants(ctx.container, self.max_depth.or(ctx.max_depth))
            }
            Scope::Source => vec![ctx.source],
            Scope::Container => vec![ctx.container],
        };

        let limit = self.take.unwrap_or(usize::MAX);
        candidates
            .into_iter()
            .filter(|&h| tree.get(h).map_or(false, |card| filter.accepts(card)))
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// chest -> [fuel_a(fuel), log(wood) -> [splinter(wood)], fuel_b(fuel)]
    fn setup() -> (CardTree, CardHandle, Vec<CardHandle>) {
        let mut tree = CardTree::new();
        let chest = tree.insert(Card::new("chest", CardCategory::Structure));
        let fuel_a = tree.insert(Card::new("coal", CardCategory::Resource).with_tag("fuel"));
        let log = tree.insert(Card::new("log", CardCategory::Resource).with_tag("wood"));
        let splinter = tree.insert(Card::new("splinter", CardCategory::Item).with_tag("wood"));
        let fuel_b = tree.insert(Card::new("coal", CardCategory::Resource).with_tag("fuel"));

        tree.add_child(chest, fuel_a, false).unwrap();
        tree.add_child(chest, log, false).unwrap();
        tree.add_child(log, splinter, false).unwrap();
        tree.add_child(chest, fuel_b, false).unwrap();
        (tree, chest, vec![fuel_a, log, splinter, fuel_b])
    }

    fn ctx(container: CardHandle, matched: &[CardHandle]) -> SelectionContext<'_> {
        SelectionContext {
            source: container,
            container,
            matched,
            max_depth: None,
        }
    }

    #[test]
    fn test_children_by_tag() {
        let (tree, chest, h) = setup();
        let fuel = TargetSelector::children().tagged("fuel").select(&tree, &ctx(chest, &[]));
        assert_eq!(fuel, vec![h[0], h[3]]);

        // Splinter is a grandchild
        let wood = TargetSelector::children().tagged("wood").select(&tree, &ctx(chest, &[]));
        assert_eq!(wood, vec![h[1]]);
    }

    #[test]
    fn test_descendants_with_depth() {
        let (tree, chest, h) = setup();
        let all_wood = TargetSelector::descendants()
            .tagged("wood")
            .select(&tree, &ctx(chest, &[]));
        assert_eq!(all_wood, vec![h[1], h[2]]);

        let shallow = TargetSelector::descendants()
            .tagged("wood")
            .max_depth(1)
            .select(&tree, &ctx(chest, &[]));
        assert_eq!(shallow, vec![h[1]]);

        // Rule-level depth applies when the selector has none
        let mut context = ctx(chest, &[]);
        context.max_depth = Some(1);
        let rule_depth = TargetSelector::descendants().tagged("wood").select(&tree, &context);
        assert_eq!(rule_depth, vec![h[1]]);
    }

    #[test]
    fn test_take_truncates_in_order() {
        let (tree, chest, h) = setup();
        let first = TargetSelector::children()
            .tagged("fuel")
            .take(1)
            .select(&tree, &ctx(chest, &[]));
        assert_eq!(first, vec![h[0]]);
    }

    #[test]
    fn test_id_and_category_filters() {
        let (tree, chest, h) = setup();
        let coal = TargetSelector::children().with_id("coal").select(&tree, &ctx(chest, &[]));
        assert_eq!(coal, vec![h[0], h[3]]);

        let items = TargetSelector::descendants()
            .in_category("item")
            .select(&tree, &ctx(chest, &[]));
        assert_eq!(items, vec![h[2]]);
    }

    #[test]
    fn test_bad_filter_values_select_nothing() {
        let (tree, chest, _) = setup();
        let context = ctx(chest, &[]);
        assert!(TargetSelector::children().tagged("").select(&tree, &context).is_empty());
        assert!(TargetSelector::children().with_id("").select(&tree, &context).is_empty());
        assert!(TargetSelector::children()
            .in_category("not-a-category")
            .select(&tree, &context)
            .is_empty());
    }

    #[test]
    fn test_matched_scope_filters_gathered_cards() {
        let (tree, chest, h) = setup();
        let matched = vec![h[3], h[1], h[0]];
        let fuel = TargetSelector::matched()
            .tagged("fuel")
            .select(&tree, &ctx(chest, &matched));
        assert_eq!(fuel, vec![h[3], h[0]]);
    }

    #[test]
    fn test_source_and_container_scopes() {
        let (tree, chest, h) = setup();
        let context = SelectionContext {
            source: h[1],
            container: chest,
            matched: &[],
            max_depth: None,
        };
        assert_eq!(TargetSelector::source().select(&tree, &context), vec![h[1]]);
        assert_eq!(TargetSelector::container().select(&tree, &context), vec![chest]);
        assert!(TargetSelector::source().tagged("fuel").select(&tree, &context).is_empty());
    }

    #[test]
    fn test_selector_from_toml() {
        let selector: TargetSelector = toml::from_str(
            r#"
scope = "children"
filter = { tag = "fuel" }
take = 1
"#,
        )
        .unwrap();
        assert_eq!(selector, TargetSelector::children().tagged("fuel").take(1));
    }
}
