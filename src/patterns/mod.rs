// src/patterns/mod.rs

//! From configured pattern to script paths.
//!
//! - [`expand`] substitutes `${env:..}` / `${command:..}` placeholders.
//! - [`resolve`] turns the expanded glob into absolute file paths.

pub mod expand;
pub mod path_utils;
pub mod resolve;

pub use expand::{command_value_to_string, tokenize, Segment, VariableExpander};
pub use resolve::resolve;
