//! Card factories - turn template ids into cards

use super::entity::Card;
use super::template::TemplateCatalog;

/// Builds cards from template ids
///
/// The engine owns its factory and calls it whenever a card is created,
/// including from rule effects in the middle of processing.
pub trait CardFactory {
    /// Build an unregistered card, `None` for unknown template ids
    fn create(&self, template_id: &str) -> Option<Card>;

    /// Template ids of the intrinsic parts a new card is assembled with
    fn intrinsic_parts(&self, _template_id: &str) -> Vec<String> {
        Vec::new()
    }

    /// Build a card and convert it into a typed wrapper
    fn create_as<T>(&self, template_id: &str) -> Option<T>
    where
        T: TryFrom<Card>,
        Self: Sized,
    {
        self.create(template_id).and_then(|card| T::try_from(card).ok())
    }
}

/// Factory backed by a template catalog
#[derive(Debug, Clone, Default)]
pub struct TemplateFactory {
    catalog: TemplateCatalog,
}

impl TemplateFactory {
    pub fn new(catalog: TemplateCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TemplateCatalog {
        &mut self.catalog
    }
}

impl CardFactory for TemplateFactory {
    fn create(&self, template_id: &str) -> Option<Card> {
        self.catalog.get(template_id).map(Card::from_template)
    }

    fn intrinsic_parts(&self, template_id: &str) -> Vec<String> {
        self.catalog
            .get(template_id)
            .map(|t| t.intrinsic_parts.clone())
            .unwrap_or_default()
    }
}
