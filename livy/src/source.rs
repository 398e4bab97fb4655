//! The Spark-backed row source.

use async_trait::async_trait;
use quarry_core::TableName;
use quarry_query::{FetchRequest, QueryResult, RowSet, RowSource};
use quarry_registry::TableSchema;
use quarry_source::{SourceError, CONFIG_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::schema::view_schema;
use crate::script::{parse_output, register_script, schema_script, select_script, DataFile, ViewNames};
use crate::sql::render_select;
use crate::{LivyConfig, LivyResult, LivySession, SparkFileConfig};

/// Row source answering fetches with Spark SQL over registered views.
pub struct LivySource {
    session: LivySession,
    tables: Vec<TableSchema>,
    config: SparkFileConfig,
}

impl LivySource {
    /// Start a session, register the data directory's files (plus configured
    /// remote files) as views and read their schemas.
    pub async fn connect(config: &LivyConfig, data_dir: Option<&Path>) -> LivyResult<Self> {
        let names = ViewNames::new()?;
        let file_config = match data_dir {
            Some(dir) => SparkFileConfig::load(&dir.join(CONFIG_FILE))?,
            None => SparkFileConfig::default(),
        };

        let mut files = match data_dir {
            Some(dir) => local_files(dir, &names)?,
            None => Vec::new(),
        };
        files.extend(
            file_config
                .remote_files
                .iter()
                .filter_map(|uri| DataFile::remote(uri, &names)),
        );

        let shipped: Vec<String> = files.iter().map(DataFile::session_file).collect();
        let session = LivySession::create(config, &shipped, &file_config.jars).await?;
        if !files.is_empty() {
            session.run(&register_script(&files)).await?;
        }

        let mut tables = Vec::with_capacity(files.len());
        for file in &files {
            let output = session.run(&schema_script(&file.view)).await?;
            let mut schema = view_schema(TableName::single(file.view.clone()), &output)?;
            file_config.file.coerce_keys(&mut schema, &mut []);
            file_config.file.apply_overrides(&mut schema);
            info!(
                table = %schema.name,
                columns = schema.columns.len(),
                location = %file.location,
                "registered Spark view"
            );
            tables.push(schema);
        }

        Ok(Self {
            session,
            tables,
            config: file_config,
        })
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }
}

fn local_files(dir: &Path, names: &ViewNames) -> LivyResult<Vec<DataFile>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| SourceError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| path.file_name().is_some_and(|f| f != CONFIG_FILE))
        .collect();
    paths.sort();

    Ok(paths
        .iter()
        .filter_map(|path| {
            let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            DataFile::local(&absolute, names)
        })
        .collect())
}

#[async_trait]
impl RowSource for LivySource {
    async fn fetch_rows(&self, request: FetchRequest) -> QueryResult<RowSet> {
        let sql = render_select(&request, &self.tables)?;
        debug!(table = %request.table, sql = %sql, "running Spark query");

        let output = self
            .session
            .run(&select_script(&sql, request.offset, request.limit))
            .await?;
        let mut result = parse_output(&output)?;
        self.config.file.coerce_row_keys(&request.table, &mut result.rows);
        Ok(result)
    }

    async fn schema(&self) -> QueryResult<Vec<TableSchema>> {
        Ok(self.tables.clone())
    }
}
