//! Modsync common types, identifier helpers, and errors.
//!
//! This crate provides foundational types shared across the modsync crates:
//! - Identifier normalization and fixed-width formatting
//! - Configuration document format versioning
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, Result};
pub use id::{
    format_fixed_width, format_identifier_str, format_identifier_value, identifier_sort_key,
    normalize_alpha_numeric_id, try_convert_str, try_convert_to_number, Coerced,
};
pub use output::OutputFormat;
pub use schema::FORMAT_VERSION;
