//! Scala snippets run in the Spark session, and parsing of their output.

use quarry_core::{Row, Value};
use quarry_query::RowSet;
use regex_lite::Regex;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;

use crate::{LivyError, LivyResult};

/// Derives Spark view names from file names.
pub struct ViewNames {
    pattern: Regex,
}

impl ViewNames {
    pub fn new() -> LivyResult<Self> {
        let pattern = Regex::new(r"[\W_]+")
            .map_err(|e| LivyError::invalid_config(format!("invalid view name pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Collapse every run of non-word characters and underscores into one `_`.
    pub fn sanitize(&self, stem: &str) -> String {
        self.pattern.replace_all(stem, "_").into_owned()
    }
}

/// A data file to register as a view.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    /// Where Spark loads the file from: a driver-local path, or a name
    /// resolved through the files shipped with the session.
    pub location: String,
    local: bool,
    pub view: String,
    format: &'static str,
}

impl DataFile {
    /// A file on the machine running the Livy server. None for unsupported
    /// file types.
    pub fn local(path: &Path, names: &ViewNames) -> Option<Self> {
        Self::new(&path.display().to_string(), true, names)
    }

    /// A file already reachable by the cluster (e.g. `hdfs://` or `s3://`).
    pub fn remote(uri: &str, names: &ViewNames) -> Option<Self> {
        Self::new(uri, false, names)
    }

    fn new(location: &str, local: bool, names: &ViewNames) -> Option<Self> {
        let file_name = location.rsplit(['/', '\\']).next().unwrap_or(location);
        let (stem, extension) = file_name.rsplit_once('.')?;
        let format = match extension.to_ascii_lowercase().as_str() {
            "csv" => "csv",
            "json" => "json",
            _ => return None,
        };
        Some(Self {
            location: location.to_string(),
            local,
            view: names.sanitize(stem),
            format,
        })
    }

    /// The entry for this file in the session's `files` list.
    pub fn session_file(&self) -> String {
        if self.local {
            format!("local:{}", self.location)
        } else {
            self.location.clone()
        }
    }

    fn file_name(&self) -> &str {
        self.location
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.location)
    }

    fn load_statement(&self) -> String {
        let options = match self.format {
            "csv" => r#".option("header", "true")"#,
            _ => r#".option("multiLine", "true")"#,
        };
        let source = if self.local {
            format!("\"{}\"", self.location)
        } else {
            format!("org.apache.spark.SparkFiles.get(\"{}\")", self.file_name())
        };
        format!(
            "spark.read.format(\"{}\"){}.option(\"inferSchema\", \"true\").load({}).createOrReplaceTempView(\"{}\")",
            self.format, options, source, self.view
        )
    }
}

/// Register every file as a temporary view.
pub fn register_script(files: &[DataFile]) -> String {
    files
        .iter()
        .map(DataFile::load_statement)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the schema of a view as JSON.
pub fn schema_script(view: &str) -> String {
    format!("println(spark.table(\"{}\").schema.json)", view)
}

/// Run a query and print the matching row count, then one JSON object per
/// row of the requested page. The block keeps the REPL from echoing values.
pub fn select_script(sql: &str, offset: Option<usize>, limit: Option<usize>) -> String {
    let offset = offset.unwrap_or(0);
    let page = match limit {
        Some(limit) => format!(".slice({}, {})", offset, offset.saturating_add(limit)),
        None if offset > 0 => format!(".drop({})", offset),
        None => String::new(),
    };
    format!(
        "{{\n  val result = spark.sql(\"\"\"{}\"\"\")\n  println(result.count)\n  result.toJSON.collect{}.foreach(println)\n}}",
        sql, page
    )
}

/// Parse the output of [`select_script`]: the first integer line is the
/// total, every following line a JSON row. Earlier lines are REPL noise.
pub fn parse_output(text: &str) -> LivyResult<RowSet> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let total = lines
        .by_ref()
        .find_map(|line| line.parse::<usize>().ok())
        .ok_or_else(|| LivyError::malformed_output("missing row count"))?;

    let rows = lines
        .map(|line| {
            let object: Map<String, JsonValue> = serde_json::from_str(line)
                .map_err(|e| LivyError::malformed_output(format!("{}: {}", e, line)))?;
            Ok(object
                .iter()
                .map(|(column, value)| (column.clone(), Value::from_json(value)))
                .collect::<Row>())
        })
        .collect::<LivyResult<Vec<Row>>>()?;

    Ok(RowSet { rows, total })
}
