//! Quarry Session
//!
//! The context a server or CLI holds: a row source and the registry built
//! from its schema. Requests are executed against it one at a time or
//! concurrently; each gets its own relationship cache.

mod error;
mod session;

pub use error::{SessionError, SessionResult};
pub use session::Session;
