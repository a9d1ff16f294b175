//! Persist curated tables to CSV.
//!
//! Column order is fixed:
//!
//! ```text
//! [index,] timestamp, indexPrice, volExpiry, volATM, vol10C, vol10P, vol25C, vol25P
//! ```
//!
//! Absent cells are written as empty fields. Each file is first written to a
//! sibling `*.tmp` file and renamed into place, so a failed write never leaves a
//! truncated or half-updated output behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use tracing::info;

use crate::domain::{CuratedRow, TimestampFormat, VolColumn};
use crate::error::CurateError;

/// Output formatting options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub timestamp_format: TimestampFormat,
    pub include_index: bool,
}

/// Header row for the given options.
pub fn header(include_index: bool) -> Vec<&'static str> {
    let mut cols = Vec::with_capacity(9);
    if include_index {
        cols.push("index");
    }
    cols.extend(["timestamp", "indexPrice", "volExpiry"]);
    cols.extend(VolColumn::ALL.iter().map(|c| c.header()));
    cols
}

/// A table written to a temporary file, waiting to be renamed into place.
#[derive(Debug)]
pub struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    /// Move the staged file onto its target path.
    ///
    /// An existing target is set aside first and kept until the returned
    /// `CommittedFile` is finished or rolled back. On error the target is
    /// left as it was and the staged file is removed.
    pub fn commit(self) -> Result<CommittedFile, CurateError> {
        let target_id = self.target.display().to_string();
        if self.target.is_dir() {
            self.discard();
            return Err(CurateError::persist(target_id, "Output path is a directory"));
        }

        let backup = if self.target.exists() {
            let backup = sibling_path(&self.target, ".bak");
            if let Err(e) = fs::rename(&self.target, &backup) {
                self.discard();
                return Err(CurateError::persist(target_id, format!("Failed to set aside previous output: {e}")));
            }
            Some(backup)
        } else {
            None
        };

        if let Err(e) = fs::rename(&self.tmp, &self.target) {
            let _ = fs::remove_file(&self.tmp);
            if let Some(backup) = &backup {
                let _ = fs::rename(backup, &self.target);
            }
            return Err(CurateError::persist(target_id, format!("Failed to move output into place: {e}")));
        }

        Ok(CommittedFile {
            target: self.target,
            backup,
        })
    }

    /// Remove the staged file without touching the target.
    pub fn discard(self) {
        let _ = fs::remove_file(&self.tmp);
    }
}

/// A table moved into place whose previous content can still be restored.
#[derive(Debug)]
pub struct CommittedFile {
    target: PathBuf,
    backup: Option<PathBuf>,
}

impl CommittedFile {
    /// Drop the previous content and keep the new file.
    pub fn finish(self) -> PathBuf {
        if let Some(backup) = &self.backup {
            let _ = fs::remove_file(backup);
        }
        self.target
    }

    /// Put the previous content back, or remove the file if there was none.
    pub fn rollback(self) {
        match &self.backup {
            Some(backup) => {
                let _ = fs::rename(backup, &self.target);
            }
            None => {
                let _ = fs::remove_file(&self.target);
            }
        }
    }
}

/// Write `rows` to `path`.
pub fn write_curated_csv(path: &Path, rows: &[CuratedRow], opts: WriteOptions) -> Result<PathBuf, CurateError> {
    stage_curated_csv(path, rows, opts)?.commit().map(CommittedFile::finish)
}

/// Write `rows` next to `path` without replacing `path` yet.
pub fn stage_curated_csv(path: &Path, rows: &[CuratedRow], opts: WriteOptions) -> Result<StagedFile, CurateError> {
    let target = path.to_path_buf();
    let target_id = target.display().to_string();
    let tmp = tmp_path(&target);

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(CurateError::persist(
                &target_id,
                format!("Output directory '{}' does not exist", parent.display()),
            ));
        }
    }

    let result = write_rows(&tmp, rows, opts);
    if let Err(message) = result {
        let _ = fs::remove_file(&tmp);
        return Err(CurateError::persist(target_id, message));
    }

    info!(path = %target.display(), rows = rows.len(), "staged output");
    Ok(StagedFile { tmp, target })
}

fn write_rows(tmp: &Path, rows: &[CuratedRow], opts: WriteOptions) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(tmp).map_err(|e| format!("Failed to create CSV: {e}"))?;
    writer
        .write_record(header(opts.include_index))
        .map_err(|e| format!("Failed to write CSV header: {e}"))?;

    let mut record: Vec<String> = Vec::with_capacity(9);
    for (i, row) in rows.iter().enumerate() {
        record.clear();
        if opts.include_index {
            record.push(i.to_string());
        }
        record.push(format_timestamp(row, opts.timestamp_format));
        record.push(row.index_price.map(|v| v.to_string()).unwrap_or_default());
        record.push(row.vol_expiry.clone().unwrap_or_default());
        record.extend(row.vols.iter().map(|v| v.to_string()));

        writer
            .write_record(&record)
            .map_err(|e| format!("Failed to write CSV row {i}: {e}"))?;
    }

    writer.flush().map_err(|e| format!("Failed to flush CSV: {e}"))
}

fn format_timestamp(row: &CuratedRow, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::EpochMs => row.timestamp.timestamp_millis().to_string(),
        TimestampFormat::Rfc3339 => row.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    sibling_path(target, ".tmp")
}

fn sibling_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    target.with_file_name(name)
}
