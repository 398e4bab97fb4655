//! Quarry Registry
//!
//! Immutable schema lookup: tables, their columns, primary keys and the
//! relationships declared between them. Loaded once at startup and shared
//! read-only by every request.

mod builder;
mod registry;
mod types;

pub use builder::{RegistryBuilder, RegistryError, TableBuilder};
pub use registry::Registry;
pub use types::*;
