//! Loading a directory of data files.

use quarry_core::TableName;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::csv_file::read_csv;
use crate::json_file::read_json;
use crate::xlsx_file::read_xlsx;
use crate::{FileConfig, MemorySource, SourceError, SourceResult, CONFIG_FILE};

/// Load every `.csv` and `.json` file of a directory as one table each,
/// named after the file stem, and every sheet of each `.xlsx` file as a
/// table named after the sheet, with `config.json` applied.
pub fn load_directory(dir: impl AsRef<Path>) -> SourceResult<MemorySource> {
    let dir = dir.as_ref();
    let config = FileConfig::load(&dir.join(CONFIG_FILE))?;

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| SourceError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut source = MemorySource::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let name = TableName::single(stem);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let raws = match extension.as_deref() {
            Some("csv") => vec![read_csv(&path, name)?],
            Some("json") if path.file_name().is_some_and(|f| f != CONFIG_FILE) => {
                vec![read_json(&path, name)?]
            }
            Some("xlsx") => read_xlsx(&path)?,
            _ => {
                debug!(path = %path.display(), "skipping unsupported file");
                continue;
            }
        };

        for raw in raws {
            let (mut schema, mut rows) = raw.into_table(&config);
            config.coerce_keys(&mut schema, &mut rows);
            config.apply_overrides(&mut schema);
            info!(
                table = %schema.name,
                columns = schema.columns.len(),
                rows = rows.len(),
                "loaded table"
            );
            source.add_table(schema, rows);
        }
    }

    Ok(source)
}
