//! Card templates - the static data a card is built from
//!
//! Templates carry display data, a category, default tags, default
//! properties, and the intrinsic parts every instance is assembled with.
//! A catalog can be filled in code or parsed from TOML.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{EngineError, Result};

/// Broad classification of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    #[default]
    Item,
    Tool,
    Resource,
    Creature,
    Structure,
    Location,
    Status,
}

impl CardCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardCategory::Item => "item",
            CardCategory::Tool => "tool",
            CardCategory::Resource => "resource",
            CardCategory::Creature => "creature",
            CardCategory::Structure => "structure",
            CardCategory::Location => "location",
            CardCategory::Status => "status",
        }
    }
}

impl FromStr for CardCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "item" => Ok(CardCategory::Item),
            "tool" => Ok(CardCategory::Tool),
            "resource" => Ok(CardCategory::Resource),
            "creature" => Ok(CardCategory::Creature),
            "structure" => Ok(CardCategory::Structure),
            "location" => Ok(CardCategory::Location),
            "status" => Ok(CardCategory::Status),
            _ => Err(EngineError::InvalidCategory(s.to_string())),
        }
    }
}

impl fmt::Display for CardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default property on a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(default)]
    pub base: f64,
}

/// Immutable template data
#[derive(Debug, Clone, PartialEq)]
pub struct CardTemplate {
    /// Unique identifier, also the id of every card built from it
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub description: String,
    pub category: CardCategory,
    /// Tags copied into each new card
    pub default_tags: Vec<String>,
    /// Properties copied into each new card
    pub properties: Vec<PropertyDef>,
    /// Template ids built and attached as intrinsic children
    pub intrinsic_parts: Vec<String>,
}

impl CardTemplate {
    pub fn new(id: impl Into<String>, category: CardCategory) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            category,
            default_tags: Vec::new(),
            properties: Vec::new(),
            intrinsic_parts: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, base: f64) -> Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            base,
        });
        self
    }

    pub fn with_part(mut self, template_id: impl Into<String>) -> Self {
        self.intrinsic_parts.push(template_id.into());
        self
    }
}

/// Catalog of card templates keyed by id
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: AHashMap<String, CardTemplate>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, replacing any previous template with the same id
    pub fn add(&mut self, template: CardTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, id: &str) -> Option<&CardTemplate> {
        self.templates.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Load templates from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse templates from TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let toml_data: TomlTemplates =
            toml::from_str(content).map_err(|e| EngineError::ParseError(e.to_string()))?;

        let mut catalog = Self::new();
        for template in toml_data.templates {
            catalog.add(template.into_template()?);
        }
        Ok(catalog)
    }
}

/// TOML representation of a templates file
#[derive(Debug, Deserialize)]
struct TomlTemplates {
    templates: Vec<TomlTemplate>,
}

/// TOML representation of a single template
#[derive(Debug, Deserialize)]
struct TomlTemplate {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    properties: Vec<PropertyDef>,
    #[serde(default)]
    parts: Vec<String>,
}

impl TomlTemplate {
    fn into_template(self) -> Result<CardTemplate> {
        if self.id.is_empty() {
            return Err(EngineError::InvalidTemplate("template id is empty".into()));
        }
        let category = self.category.parse::<CardCategory>()?;

        Ok(CardTemplate {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description,
            category,
            default_tags: self.tags,
            properties: self.properties,
            intrinsic_parts: self.parts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!("tool".parse::<CardCategory>().unwrap(), CardCategory::Tool);
        assert_eq!(" Resource ".parse::<CardCategory>().unwrap(), CardCategory::Resource);
        assert!(matches!(
            "wizardry".parse::<CardCategory>(),
            Err(EngineError::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_category_display_roundtrip() {
        for category in [
            CardCategory::Item,
            CardCategory::Tool,
            CardCategory::Resource,
            CardCategory::Creature,
            CardCategory::Structure,
            CardCategory::Location,
            CardCategory::Status,
        ] {
            assert_eq!(category.to_string().parse::<CardCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[[templates]]
id = "workbench"
name = "Workbench"
category = "structure"
tags = ["crafting-tool"]
parts = ["vise"]

[[templates]]
id = "log"
category = "resource"
tags = ["wood"]
properties = [{ name = "weight", base = 3.0 }]
"#;

        let catalog = TemplateCatalog::parse_toml(toml).unwrap();
        assert_eq!(catalog.len(), 2);

        let bench = catalog.get("workbench").unwrap();
        assert_eq!(bench.name, "Workbench");
        assert_eq!(bench.category, CardCategory::Structure);
        assert_eq!(bench.intrinsic_parts, vec!["vise".to_string()]);

        let log = catalog.get("log").unwrap();
        // Name falls back to the id
        assert_eq!(log.name, "log");
        assert_eq!(log.properties[0].base, 3.0);
    }

    #[test]
    fn test_parse_toml_invalid_category() {
        let toml = r#"
[[templates]]
id = "rock"
category = "pebble"
"#;
        let result = TemplateCatalog::parse_toml(toml);
        assert!(matches!(result, Err(EngineError::InvalidCategory(_))));
    }

    #[test]
    fn test_builder_helpers() {
        let template = CardTemplate::new("torch", CardCategory::Item)
            .with_name("Torch")
            .with_tags(["light", "flammable"])
            .with_property("burn_time", 30.0);

        assert_eq!(template.default_tags, vec!["light", "flammable"]);
        assert_eq!(template.properties.len(), 1);
        assert!(template.intrinsic_parts.is_empty());
    }
}
