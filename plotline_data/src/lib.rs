//! Shared story definition model for Plotline content.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_story};
