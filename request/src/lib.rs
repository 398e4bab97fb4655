//! Quarry Request
//!
//! The query request and response model exchanged with callers. Field names,
//! optionality and `type` discriminators follow the data-connector wire
//! contract exactly, so values deserialize from and serialize to the JSON that
//! existing callers send and expect.
//!
//! Also provides the deterministic expression printer used in diagnostics.

mod expression;
mod printer;
mod query;
mod request;
mod response;

pub use expression::*;
pub use query::*;
pub use request::*;
pub use response::*;
