//! Property tests for the card tree and the registry
//!
//! Random sequences of attach and detach calls must never break the forest
//! shape, intrinsic children must resist unforced removal, and registry
//! indices must stay dense per template id.

use std::collections::BTreeSet;

use proptest::prelude::*;

use card_forge::card::{Card, CardCategory, CardTemplate, CardTree, TemplateCatalog, TemplateFactory};
use card_forge::core::CardHandle;
use card_forge::engine::Engine;

const CARDS: u32 = 8;

#[derive(Debug, Clone)]
enum TreeOp {
    Add { parent: u32, child: u32, intrinsic: bool },
    Remove { parent: u32, child: u32, force: bool },
    Detach { child: u32, force: bool },
}

fn tree_op() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        (0..CARDS, 0..CARDS, any::<bool>())
            .prop_map(|(parent, child, intrinsic)| TreeOp::Add { parent, child, intrinsic }),
        (0..CARDS, 0..CARDS, any::<bool>())
            .prop_map(|(parent, child, force)| TreeOp::Remove { parent, child, force }),
        (0..CARDS, any::<bool>()).prop_map(|(child, force)| TreeOp::Detach { child, force }),
    ]
}

fn new_tree() -> CardTree {
    let mut tree = CardTree::new();
    for i in 0..CARDS {
        tree.insert(Card::new(format!("card{}", i), CardCategory::Item));
    }
    tree
}

fn apply(tree: &mut CardTree, op: &TreeOp) {
    match *op {
        TreeOp::Add { parent, child, intrinsic } => {
            let _ = tree.add_child(CardHandle(parent), CardHandle(child), intrinsic);
        }
        TreeOp::Remove { parent, child, force } => {
            tree.remove_child(CardHandle(parent), CardHandle(child), force);
        }
        TreeOp::Detach { child, force } => {
            tree.detach(CardHandle(child), force);
        }
    }
}

/// Owner links and children lists agree, and no card owns itself transitively
fn assert_forest(tree: &CardTree) {
    let mut claimed = BTreeSet::new();
    for handle in tree.handles() {
        for &child in tree.children(handle) {
            assert!(claimed.insert(child), "{:?} listed under two owners", child);
            assert_eq!(tree.owner(child), Some(handle));
        }
    }
    for handle in tree.handles() {
        if let Some(owner) = tree.owner(handle) {
            assert!(tree.children(owner).contains(&handle));
        }
        let chain: Vec<CardHandle> = tree.ancestors(handle).take(CARDS as usize + 1).collect();
        assert!(chain.len() <= CARDS as usize - 1, "owner chain of {:?} loops", handle);
        assert!(!chain.contains(&handle));
    }
}

proptest! {
    #[test]
    fn test_forest_invariant(ops in prop::collection::vec(tree_op(), 0..64)) {
        let mut tree = new_tree();
        for op in &ops {
            apply(&mut tree, op);
            assert_forest(&tree);
        }
    }

    #[test]
    fn test_intrinsic_child_needs_force(
        ops in prop::collection::vec(tree_op(), 0..32),
        host in 0..CARDS,
    ) {
        let mut tree = new_tree();
        for op in &ops {
            apply(&mut tree, op);
        }
        // Always have at least one intrinsic pair to check
        let part = tree.insert(Card::new("part", CardCategory::Item));
        prop_assert!(tree.add_child(CardHandle(host), part, true).is_ok());

        let pairs: Vec<(CardHandle, CardHandle)> = tree
            .handles()
            .flat_map(|parent| {
                let card = tree.get(parent);
                tree.children(parent)
                    .iter()
                    .filter(move |&&child| card.map_or(false, |c| c.is_intrinsic(child)))
                    .map(move |&child| (parent, child))
            })
            .collect();

        for (parent, child) in pairs {
            let before: Vec<CardHandle> = tree.children(parent).to_vec();
            prop_assert!(!tree.remove_child(parent, child, false));
            prop_assert!(!tree.detach(child, false));
            prop_assert_eq!(tree.children(parent), before.as_slice());
            prop_assert_eq!(tree.owner(child), Some(parent));

            prop_assert!(tree.remove_child(parent, child, true));
            prop_assert_eq!(tree.owner(child), None);
            prop_assert!(!tree.get(parent).map_or(true, |p| p.is_intrinsic(child)));
        }
    }

    #[test]
    fn test_indices_dense_per_template(order in prop::collection::vec(0usize..3, 1..12)) {
        let ids = ["torch", "rope", "flint"];
        let mut catalog = TemplateCatalog::new();
        for id in ids {
            catalog.add(CardTemplate::new(id, CardCategory::Item));
        }
        let mut engine = Engine::default().with_factory(TemplateFactory::new(catalog));

        for &pick in &order {
            prop_assert!(engine.create_card(ids[pick]).unwrap().is_some());
        }

        for (pick, id) in ids.iter().enumerate() {
            let expected: BTreeSet<u32> =
                (0..order.iter().filter(|&&p| p == pick).count() as u32).collect();
            let indices: BTreeSet<u32> = engine
                .get_all_by_id(id)
                .iter()
                .filter_map(|&h| engine.card(h).and_then(|c| c.index()))
                .collect();
            prop_assert_eq!(indices, expected);
        }
    }
}

#[test]
fn test_three_torches_get_indices_zero_to_two() {
    let mut catalog = TemplateCatalog::new();
    catalog.add(CardTemplate::new("torch", CardCategory::Item));
    let mut engine = Engine::default().with_factory(TemplateFactory::new(catalog));

    let torches: Vec<CardHandle> = (0..3)
        .map(|_| engine.create_card("torch").unwrap().unwrap())
        .collect();
    let indices: BTreeSet<u32> = torches
        .iter()
        .filter_map(|&h| engine.card(h).and_then(|c| c.index()))
        .collect();
    assert_eq!(indices, BTreeSet::from([0, 1, 2]));
}
