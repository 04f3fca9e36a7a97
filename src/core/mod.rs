pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, ExecutionMode, RuleSelection};
pub use error::{EngineError, Result};
pub use types::{CardHandle, CardKey, ListenerId};
