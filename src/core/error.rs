use thiserror::Error;

use crate::core::types::CardHandle;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Card not found: {0:?}")]
    UnknownCard(CardHandle),

    #[error("Card {child:?} already has an owner ({owner:?})")]
    AlreadyOwned { child: CardHandle, owner: CardHandle },

    #[error("Card {0:?} cannot own itself")]
    SelfOwnership(CardHandle),

    #[error("Card {child:?} is an ancestor of {parent:?}")]
    OwnershipCycle { child: CardHandle, parent: CardHandle },

    #[error("Rule already registered: {0}")]
    DuplicateRule(String),

    #[error("Invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("Invalid card category: {0}")]
    InvalidCategory(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
