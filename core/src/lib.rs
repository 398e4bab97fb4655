//! Quarry Core Types
//!
//! This crate provides the foundational types shared by every Quarry crate:
//! - Scalar values as they travel between row sources and responses
//! - Table names (ordered, non-empty name segments)
//! - Raw rows as returned by a row source

mod table;
mod value;

pub use table::*;
pub use value::*;
