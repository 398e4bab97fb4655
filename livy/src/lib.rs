//! Quarry Livy
//!
//! A row source backed by a remote Spark cluster reached through the Livy
//! REST interface. Data files are registered as temporary views in a single
//! Spark session; every fetch is rendered to Spark SQL, run as a statement
//! and parsed back from its printed output.

mod config;
mod error;
mod schema;
mod script;
mod session;
mod source;
mod sql;

pub use config::{LivyConfig, SparkFileConfig};
pub use error::{LivyError, LivyResult};
pub use schema::view_schema;
pub use script::{parse_output, register_script, schema_script, select_script, DataFile, ViewNames};
pub use session::LivySession;
pub use source::LivySource;
pub use sql::render_select;
