//! Card layer - entities, their tree, templates, and factories

pub mod entity;
pub mod factory;
pub mod property;
pub mod template;
pub mod tree;

pub use entity::{Card, Listener};
pub use factory::{CardFactory, TemplateFactory};
pub use property::{Modifier, ModifierKind, Property};
pub use template::{CardCategory, CardTemplate, PropertyDef, TemplateCatalog};
pub use tree::{Ancestors, CardTree};
