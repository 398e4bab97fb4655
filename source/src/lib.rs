//! Quarry Source
//!
//! Row sources backed by local data.
//!
//! - [`MemorySource`] holds typed tables in memory and evaluates the full
//!   filter algebra itself
//! - [`load_directory`] builds a `MemorySource` from a directory of CSV,
//!   JSON and spreadsheet files, guessing column types and primary keys
//! - [`FileConfig`] is the optional `config.json` of such a directory

mod config;
mod csv_file;
mod directory;
mod error;
mod filter;
mod guess;
mod json_file;
mod memory;
mod xlsx_file;

pub use config::{BooleanLiterals, ColumnOverride, FileConfig, KeyCoercion, TableOverride, CONFIG_FILE};
pub use directory::load_directory;
pub use error::{SourceError, SourceResult};
pub use guess::{guess_primary_key, parse_datetime, ColumnKind, RawTable};
pub use memory::MemorySource;
