//! Account configuration.
//!
//! Provides the serde account model and its validation.

mod model;
mod validation;

pub use model::{AccountConfig, Queueing, Security};
pub use validation::{ValidationError, ValidationResult, validate_account};
