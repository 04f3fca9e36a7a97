//! Card Forge - workbench demo
//!
//! Loads card templates and crafting rules from TOML, sets up a workbench
//! with a knife, resin and a stick, uses the knife, and prints the result.
//!
//! Usage: `card-forge [templates.toml] [rules.toml] [config.toml]`

use card_forge::card::{CardCategory, TemplateCatalog, TemplateFactory};
use card_forge::core::error::Result;
use card_forge::core::{CardHandle, EngineConfig};
use card_forge::engine::Engine;
use card_forge::rules::load_rules;

use std::path::PathBuf;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("card_forge=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let templates_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/templates.toml"));
    let rules_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/rules.toml"));
    let config = match args.next() {
        Some(path) => EngineConfig::load(&PathBuf::from(path))?,
        None => EngineConfig::default(),
    };

    let catalog = TemplateCatalog::load_from_toml(&templates_path)?;
    tracing::info!("Loaded {} templates", catalog.len());

    let mut engine = Engine::new(config).with_factory(TemplateFactory::new(catalog));
    engine.register_rules(load_rules(&rules_path)?)?;

    let Some(bench) = engine.create_card("workbench")? else {
        tracing::warn!("No 'workbench' template in {}", templates_path.display());
        return Ok(());
    };
    let mut knife = None;
    for id in ["knife", "resin", "stick"] {
        if let Some(card) = engine.create_card(id)? {
            engine.add_child(bench, card, false)?;
            if id == "knife" {
                knife = Some(card);
            }
        }
    }

    println!("Before:");
    print_tree(&engine, bench, 1);

    if let Some(knife) = knife {
        engine.use_card(knife)?;
        engine.pump_all()?;
    }

    println!("After:");
    print_tree(&engine, bench, 1);
    Ok(())
}

fn print_tree(engine: &Engine, root: CardHandle, indent: usize) {
    let Some(card) = engine.card(root) else {
        return;
    };
    let key = card
        .key()
        .map(|k| k.to_string())
        .unwrap_or_else(|| card.id().to_string());
    let tags: Vec<&str> = card.tags().collect();
    let category = if card.category() == CardCategory::Structure {
        String::new()
    } else {
        format!(" <{}>", card.category())
    };
    println!(
        "{}{} \"{}\"{} [{}]",
        "  ".repeat(indent),
        key,
        card.name(),
        category,
        tags.join(", ")
    );
    for property in card.properties() {
        println!(
            "{}  {} = {}",
            "  ".repeat(indent),
            property.name(),
            property.value()
        );
    }
    for &child in card.children() {
        print_tree(engine, child, indent + 1);
    }
}
