//! Table schemas from Spark's inferred view schemas.

use quarry_core::TableName;
use quarry_registry::{Column, TableSchema};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::{LivyError, LivyResult};

#[derive(Debug, Deserialize)]
struct SparkStruct {
    #[serde(default)]
    fields: Vec<SparkField>,
}

#[derive(Debug, Deserialize)]
struct SparkField {
    name: String,
    #[serde(rename = "type")]
    data_type: JsonValue,
    #[serde(default)]
    nullable: bool,
}

/// Build a table schema from the printed `schema.json` of a view. Nested
/// struct and array columns are dropped since rows only carry scalars.
pub fn view_schema(name: TableName, output: &str) -> LivyResult<TableSchema> {
    let json = output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| LivyError::malformed_output(format!("no schema printed for {}", name)))?;
    let spark: SparkStruct =
        serde_json::from_str(json).map_err(|e| LivyError::malformed_output(e.to_string()))?;

    let mut schema = TableSchema::new(name);
    for field in spark.fields {
        let JsonValue::String(type_name) = &field.data_type else {
            continue;
        };
        let mut column = Column::new(field.name, scalar_type(type_name));
        if field.nullable {
            column = column.nullable();
        }
        schema.columns.push(column);
    }
    Ok(schema)
}

fn scalar_type(spark_type: &str) -> &str {
    match spark_type {
        "long" => "integer",
        "double" => "float",
        other => other,
    }
}
