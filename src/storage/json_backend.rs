use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    core::utils::{ensure_dir, PathResolver},
    errors::{Result, SplitError},
};

use super::{ensure_row_id, merge_patch, row_id, Record, RowFilter, SessionUser, StorageBackend, Table};

const TABLE_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// File-backed stand-in for the hosted collaborator: one JSON array per
/// table, rewritten atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    tables_dir: PathBuf,
    session_file: PathBuf,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let tables_dir = PathResolver::tables_dir_in(&app_root);
        ensure_dir(&tables_dir)?;
        let session_file = PathResolver::session_file_in(&app_root);
        Ok(Self {
            root: app_root,
            tables_dir,
            session_file,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.tables_dir
            .join(format!("{}.{}", table.as_str(), TABLE_EXTENSION))
    }

    /// Records the signed-in account reported by [`StorageBackend::current_user`].
    pub fn set_session_user(&self, user: Option<&SessionUser>) -> Result<()> {
        match user {
            Some(user) => {
                let json = serde_json::to_string_pretty(user)?;
                replace_file(&self.session_file, &json)
            }
            None => {
                if self.session_file.exists() {
                    fs::remove_file(&self.session_file)?;
                }
                Ok(())
            }
        }
    }

    fn read_table(&self, table: Table) -> Result<Vec<Record>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write_table(&self, table: Table, rows: &[Record]) -> Result<()> {
        let json = serde_json::to_string_pretty(rows)?;
        replace_file(&self.table_path(table), &json)
    }
}

impl StorageBackend for JsonStorage {
    fn insert_row(&self, table: Table, mut record: Record) -> Result<Record> {
        let mut rows = self.read_table(table)?;
        let id = ensure_row_id(&mut record);
        if rows.iter().any(|row| row_id(row) == Some(id.as_str())) {
            return Err(SplitError::Storage(format!(
                "duplicate id `{}` in `{}`",
                id, table
            )));
        }
        rows.push(record.clone());
        self.write_table(table, &rows)?;
        Ok(record)
    }

    fn update_row(&self, table: Table, id: &str, patch: Record) -> Result<Record> {
        let mut rows = self.read_table(table)?;
        let row = rows
            .iter_mut()
            .find(|row| row_id(row) == Some(id))
            .ok_or_else(|| SplitError::NotFound(format!("row `{}` in `{}`", id, table)))?;
        merge_patch(row, patch);
        let updated = row.clone();
        self.write_table(table, &rows)?;
        Ok(updated)
    }

    fn select_rows(&self, table: Table, filter: &RowFilter) -> Result<Vec<Record>> {
        Ok(self
            .read_table(table)?
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect())
    }

    fn current_user(&self) -> Result<Option<SessionUser>> {
        if !self.session_file.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.session_file)?;
        Ok(Some(serde_json::from_str(&data)?))
    }
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Stages `data` next to `path` and renames it into place.
pub(crate) fn replace_file(path: &Path, data: &str) -> Result<()> {
    let tmp = tmp_path(path);
    write_atomic(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
