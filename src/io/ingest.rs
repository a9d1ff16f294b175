//! CSV ingest for the high-frequency and daily sources.
//!
//! Design goals:
//! - **Strict schema** for required columns (errors name the source file)
//! - **Fail fast**: a malformed required cell aborts the load, with its line number
//! - **Deterministic order**: high-frequency files are read in parallel but
//!   concatenated in the configured list order
//! - **Separation of concerns**: no time alignment here, timestamps stay epoch ms

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{RawDailyRow, RawHfRow, VOL_COLUMNS, VolColumn};
use crate::error::CurateError;

const TIMESTAMP: &str = "timestamp";
const INDEX_PRICE: &str = "indexPrice";
const VOL_EXPIRY: &str = "volExpiry";

/// Rows logged from the end of each table at debug level.
const TAIL_ROWS: usize = 5;

/// Loader output: concatenated high-frequency rows plus the daily rows.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub hf: Vec<RawHfRow>,
    pub daily: Vec<RawDailyRow>,
    /// Row count per high-frequency source, in list order.
    pub hf_rows_per_source: Vec<(PathBuf, usize)>,
}

/// Load every high-frequency source and the daily source.
///
/// High-frequency files are read concurrently; the result keeps the order of
/// `hf_sources`. If several sources fail, the first failing one in list order
/// is reported.
pub fn load_sources(hf_sources: &[PathBuf], daily_source: &Path) -> Result<LoadedData, CurateError> {
    let per_source: Vec<Result<Vec<RawHfRow>, CurateError>> =
        hf_sources.par_iter().map(|path| read_hf_csv(path)).collect();

    let mut hf = Vec::new();
    let mut hf_rows_per_source = Vec::with_capacity(hf_sources.len());
    for (path, rows) in hf_sources.iter().zip(per_source) {
        let rows = rows?;
        info!(source = %path.display(), rows = rows.len(), "loaded high-frequency source");
        hf_rows_per_source.push((path.clone(), rows.len()));
        hf.extend(rows);
    }

    let daily = read_daily_csv(daily_source)?;
    info!(source = %daily_source.display(), rows = daily.len(), "loaded daily source");

    for row in hf.iter().rev().take(TAIL_ROWS).rev() {
        debug!(timestamp_ms = row.timestamp_ms, index_price = row.index_price, "hf tail");
    }
    for row in daily.iter().rev().take(TAIL_ROWS).rev() {
        debug!(
            timestamp_ms = row.timestamp_ms,
            vol_expiry = row.vol_expiry.as_deref().unwrap_or(""),
            vol_atm = ?row.vols[VolColumn::Atm.index()],
            "daily tail"
        );
    }

    Ok(LoadedData {
        hf,
        daily,
        hf_rows_per_source,
    })
}

/// Read one high-frequency CSV file.
pub fn read_hf_csv(path: &Path) -> Result<Vec<RawHfRow>, CurateError> {
    let source_id = path.display().to_string();
    let file = File::open(path).map_err(|e| CurateError::load(&source_id, format!("Failed to open CSV: {e}")))?;
    parse_hf(file, &source_id)
}

/// Read the daily surface CSV file.
pub fn read_daily_csv(path: &Path) -> Result<Vec<RawDailyRow>, CurateError> {
    let source_id = path.display().to_string();
    let file = File::open(path).map_err(|e| CurateError::load(&source_id, format!("Failed to open CSV: {e}")))?;
    parse_daily(file, &source_id)
}

/// Parse high-frequency rows from any reader; `source_id` is used in errors.
pub fn parse_hf<R: Read>(input: R, source_id: &str) -> Result<Vec<RawHfRow>, CurateError> {
    let mut reader = csv_reader(input);
    let header_map = read_header_map(&mut reader, source_id)?;
    let ts_idx = require_column(&header_map, TIMESTAMP, source_id)?;
    let price_idx = require_column(&header_map, INDEX_PRICE, source_id)?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, and CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| CurateError::load(source_id, format!("CSV parse error at line {line}: {e}")))?;

        let timestamp_ms = parse_timestamp(&record, ts_idx, line, source_id)?;
        let index_price = required_cell(&record, price_idx, INDEX_PRICE, line, source_id)
            .and_then(|s| parse_f64(s, INDEX_PRICE, line, source_id))?;

        rows.push(RawHfRow {
            timestamp_ms,
            index_price,
        });
    }
    Ok(rows)
}

/// Parse daily rows from any reader; `source_id` is used in errors.
pub fn parse_daily<R: Read>(input: R, source_id: &str) -> Result<Vec<RawDailyRow>, CurateError> {
    let mut reader = csv_reader(input);
    let header_map = read_header_map(&mut reader, source_id)?;
    let ts_idx = require_column(&header_map, TIMESTAMP, source_id)?;
    let price_idx = require_column(&header_map, INDEX_PRICE, source_id)?;
    let expiry_idx = require_column(&header_map, VOL_EXPIRY, source_id)?;
    let mut vol_idx = [0usize; VOL_COLUMNS];
    for col in VolColumn::ALL {
        vol_idx[col.index()] = require_column(&header_map, col.header(), source_id)?;
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| CurateError::load(source_id, format!("CSV parse error at line {line}: {e}")))?;

        let timestamp_ms = parse_timestamp(&record, ts_idx, line, source_id)?;
        let index_price = optional_cell(&record, price_idx)
            .map(|s| parse_f64(s, INDEX_PRICE, line, source_id))
            .transpose()?;
        let vol_expiry = optional_cell(&record, expiry_idx).map(str::to_string);

        let mut vols = [None; VOL_COLUMNS];
        for col in VolColumn::ALL {
            vols[col.index()] = optional_cell(&record, vol_idx[col.index()])
                .map(|s| parse_f64(s, col.header(), line, source_id))
                .transpose()?;
        }

        rows.push(RawDailyRow {
            timestamp_ms,
            index_price,
            vol_expiry,
            vols,
        });
    }
    Ok(rows)
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn read_header_map<R: Read>(
    reader: &mut csv::Reader<R>,
    source_id: &str,
) -> Result<HashMap<String, usize>, CurateError> {
    let headers = reader
        .headers()
        .map_err(|e| CurateError::load(source_id, format!("Failed to read CSV headers: {e}")))?;
    Ok(build_header_map(headers))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn require_column(header_map: &HashMap<String, usize>, name: &str, source_id: &str) -> Result<usize, CurateError> {
    header_map
        .get(&name.to_ascii_lowercase())
        .copied()
        .ok_or_else(|| CurateError::load(source_id, format!("Missing required column: `{name}`")))
}

fn optional_cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn required_cell<'a>(
    record: &'a StringRecord,
    idx: usize,
    name: &str,
    line: usize,
    source_id: &str,
) -> Result<&'a str, CurateError> {
    optional_cell(record, idx)
        .ok_or_else(|| CurateError::load(source_id, format!("Missing required value `{name}` at line {line}")))
}

fn parse_timestamp(record: &StringRecord, idx: usize, line: usize, source_id: &str) -> Result<i64, CurateError> {
    let raw = required_cell(record, idx, TIMESTAMP, line, source_id)?;
    raw.parse::<i64>().map_err(|_| {
        CurateError::load(
            source_id,
            format!("Invalid `{TIMESTAMP}` '{raw}' at line {line} (expected integer epoch milliseconds)"),
        )
    })
}

fn parse_f64(raw: &str, name: &str, line: usize, source_id: &str) -> Result<f64, CurateError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CurateError::load(
            source_id,
            format!("Invalid `{name}` '{raw}' at line {line}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const DAILY_HEADER: &str =
        "currency,timestamp,indexPrice,underlyingPrice,volExpiry,volATM,vol10C,vol10P,vol25C,vol25P";

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn hf_parse_reads_required_columns_and_ignores_extras() {
        let csv = "\u{feff}timestamp,indexPrice,extra\n1000,100.5,x\n2000,101.0,y\n";
        let rows = parse_hf(csv.as_bytes(), "hf.csv").unwrap();
        assert_eq!(
            rows,
            vec![
                RawHfRow { timestamp_ms: 1000, index_price: 100.5 },
                RawHfRow { timestamp_ms: 2000, index_price: 101.0 },
            ]
        );
    }

    #[test]
    fn hf_parse_missing_column_names_source() {
        let err = parse_hf("timestamp,price\n1000,1.0\n".as_bytes(), "22-7-12.csv").unwrap_err();
        match err {
            CurateError::Load { source_id, message } => {
                assert_eq!(source_id, "22-7-12.csv");
                assert!(message.contains("indexPrice"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn hf_parse_rejects_bad_timestamp_with_line() {
        let err = parse_hf("timestamp,indexPrice\n1000,1.0\nsoon,2.0\n".as_bytes(), "hf.csv").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn daily_parse_keeps_blank_cells_absent() {
        let csv = format!("{DAILY_HEADER}\nBTC,60000,20000,20010,27JAN23,0.55,,0.61,0.57,0.59\n");
        let rows = parse_daily(csv.as_bytes(), "daily.csv").unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.timestamp_ms, 60_000);
        assert_eq!(row.index_price, Some(20000.0));
        assert_eq!(row.vol_expiry.as_deref(), Some("27JAN23"));
        assert_eq!(row.vols, [Some(0.55), None, Some(0.61), Some(0.57), Some(0.59)]);
    }

    #[test]
    fn daily_parse_requires_every_vol_column() {
        let csv = "timestamp,indexPrice,volExpiry,volATM,vol10C,vol10P,vol25C\n";
        let err = parse_daily(csv.as_bytes(), "daily.csv").unwrap_err();
        assert!(err.to_string().contains("vol25P"), "{err}");
    }

    #[test]
    fn load_sources_concatenates_in_list_order() {
        let dir = tempfile::tempdir().unwrap();
        // Later timestamps in the first file: order must follow the list, not the data.
        let a = write_file(dir.path(), "a.csv", "timestamp,indexPrice\n5000,5.0\n6000,6.0\n");
        let b = write_file(dir.path(), "b.csv", "timestamp,indexPrice\n1000,1.0\n");
        let c = write_file(dir.path(), "c.csv", "timestamp,indexPrice\n3000,3.0\n4000,4.0\n");
        let daily = write_file(
            dir.path(),
            "daily.csv",
            &format!("{DAILY_HEADER}\nBTC,60000,1,1,E1,0.5,0.5,0.5,0.5,0.5\n"),
        );

        let loaded = load_sources(&[a.clone(), b.clone(), c.clone()], &daily).unwrap();
        let ts: Vec<i64> = loaded.hf.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(ts, vec![5000, 6000, 1000, 3000, 4000]);
        assert_eq!(loaded.hf_rows_per_source, vec![(a, 2), (b, 1), (c, 2)]);
        assert_eq!(loaded.daily.len(), 1);
    }

    #[test]
    fn load_sources_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let daily = write_file(dir.path(), "daily.csv", &format!("{DAILY_HEADER}\n"));
        let missing = dir.path().join("missing.csv");

        let err = load_sources(&[missing.clone()], &daily).unwrap_err();
        match err {
            CurateError::Load { source_id, .. } => assert_eq!(source_id, missing.display().to_string()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
