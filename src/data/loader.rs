use std::fs::File;
use std::path::Path;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::model::{AccessibilityMatrix, NodeRow, NodeTable, PodScores, Sets};
use crate::error::{DataError, Result};

pub const AREA_COLUMN: &str = "Area";
pub const DEMAND_COLUMN: &str = "Demand";
pub const ORIGIN_COLUMN: &str = "OriginID";
pub const DESTINATION_COLUMN: &str = "DestinationID";
pub const DURATION_COLUMN: &str = "Total_TruckingDuration";

// ---------------------------------------------------------------------------
// CSV dialect
// ---------------------------------------------------------------------------

/// Field and decimal separators of the input files.
///
/// The default is the European layout the scenario generators write:
/// `;` between fields and `,` as decimal mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvDialect {
    pub delimiter: char,
    pub decimal: char,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: ';',
            decimal: ',',
        }
    }
}

impl CsvDialect {
    /// Plain `,` / `.` CSV.
    pub fn standard() -> Self {
        Self {
            delimiter: ',',
            decimal: '.',
        }
    }

    fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                DataError::Config(format!("delimiter {:?} is not ASCII", self.delimiter))
            })
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Coerce a cell to a number. Empty or unparseable cells become `None`.
pub fn parse_decimal(cell: &str, decimal: char) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let value = if decimal == '.' {
        cell.parse::<f64>()
    } else {
        cell.replace(decimal, ".").parse::<f64>()
    };
    value.ok().filter(|v| !v.is_nan())
}

/// Coerce a cell to a non-negative integral id, accepting `"12"` as well as
/// `"12,0"`.
fn parse_id(cell: &str, decimal: char) -> Option<u32> {
    let value = parse_decimal(cell, decimal)?;
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value as u32)
}

/// Min–max scale a column to `[0, 1]`.
///
/// Missing values stay missing and are ignored when finding the extremes. A
/// constant column maps every present value to 0.
pub fn normalize_column(column: &[Option<f64>]) -> Vec<Option<f64>> {
    let (min, max) = column
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });

    if min == max {
        return column.iter().map(|x| x.map(|_| 0.0)).collect();
    }
    let span = max - min;
    column.iter().map(|x| x.map(|x| (x - min) / span)).collect()
}

// ---------------------------------------------------------------------------
// Reader plumbing
// ---------------------------------------------------------------------------

fn open_reader(path: &Path, dialect: &CsvDialect) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(dialect.delimiter_byte()?)
        .flexible(true)
        .from_reader(file))
}

fn read_headers(reader: &mut csv::Reader<File>, path: &Path) -> Result<Vec<String>> {
    let headers = reader.headers().map_err(|source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect())
}

fn column_index(headers: &[String], column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| DataError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}

fn for_each_record<F>(reader: &mut csv::Reader<File>, path: &Path, mut f: F) -> Result<()>
where
    F: FnMut(&csv::StringRecord),
{
    for result in reader.records() {
        let record = result.map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        f(&record);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Node files
// ---------------------------------------------------------------------------

/// Load a node file keeping `Area` and `Demand`.
///
/// Unparseable cells become missing; missing demand is then replaced by 0
/// while missing area is kept as `None`.
pub fn load_and_process_nodes(path: &Path, dialect: &CsvDialect) -> Result<NodeTable> {
    let mut reader = open_reader(path, dialect)?;
    let headers = read_headers(&mut reader, path)?;
    let area_idx = column_index(&headers, AREA_COLUMN, path)?;
    let demand_idx = column_index(&headers, DEMAND_COLUMN, path)?;

    let mut rows = Vec::new();
    for_each_record(&mut reader, path, |record| {
        let cell = |idx: usize| parse_decimal(record.get(idx).unwrap_or(""), dialect.decimal);
        rows.push(NodeRow {
            area: cell(area_idx),
            demand: cell(demand_idx).unwrap_or(0.0),
        });
    })?;

    let missing_areas = rows.iter().filter(|r| r.area.is_none()).count();
    if missing_areas > 0 {
        warn!("{}: {missing_areas} rows without a numeric area", path.display());
    }
    debug!("{}: {} node rows", path.display(), rows.len());

    Ok(NodeTable { rows })
}

// ---------------------------------------------------------------------------
// Accessibility matrices
// ---------------------------------------------------------------------------

struct TripRow {
    origin: Option<u32>,
    destination: Option<u32>,
    duration: Option<f64>,
}

fn load_trip_rows(path: &Path, dialect: &CsvDialect, with_origin: bool) -> Result<Vec<TripRow>> {
    let mut reader = open_reader(path, dialect)?;
    let headers = read_headers(&mut reader, path)?;
    let origin_idx = if with_origin {
        Some(column_index(&headers, ORIGIN_COLUMN, path)?)
    } else {
        None
    };
    let destination_idx = column_index(&headers, DESTINATION_COLUMN, path)?;
    let duration_idx = column_index(&headers, DURATION_COLUMN, path)?;

    let mut rows = Vec::new();
    for_each_record(&mut reader, path, |record| {
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        rows.push(TripRow {
            origin: origin_idx.and_then(|idx| parse_id(cell(idx), dialect.decimal)),
            destination: parse_id(cell(destination_idx), dialect.decimal),
            duration: parse_decimal(cell(duration_idx), dialect.decimal),
        });
    })?;
    Ok(rows)
}

/// Accessibility scores of the trip rows, in row order.
fn accessibility_scores(rows: &[TripRow]) -> Vec<Option<f64>> {
    let durations: Vec<Option<f64>> = rows.iter().map(|r| r.duration).collect();
    normalize_column(&durations)
}

/// Load the LDC → POD matrix of one scenario.
///
/// Every POD in J starts at 0 and is overwritten by the normalized duration
/// of each row whose `DestinationID` is a POD. Other rows are ignored.
pub fn load_v0_matrix(path: &Path, sets: &Sets, dialect: &CsvDialect) -> Result<PodScores> {
    let rows = load_trip_rows(path, dialect, false)?;
    let scores = accessibility_scores(&rows);

    let mut v0 = PodScores::new(sets);
    let mut ignored = 0usize;
    for (row, score) in rows.iter().zip(scores) {
        let stored = match (row.destination, score) {
            (Some(pod), Some(score)) => v0.set(pod, score),
            _ => false,
        };
        if !stored {
            ignored += 1;
        }
    }
    debug!(
        "{}: {} v0 rows, {ignored} ignored",
        path.display(),
        rows.len()
    );
    Ok(v0)
}

/// Load the POD → demand node matrix of one scenario.
///
/// Rows are kept only when `OriginID` is in J and `DestinationID` is in I.
pub fn load_v_matrix(path: &Path, sets: &Sets, dialect: &CsvDialect) -> Result<AccessibilityMatrix> {
    let rows = load_trip_rows(path, dialect, true)?;
    let scores = accessibility_scores(&rows);

    let mut v = AccessibilityMatrix::new(sets);
    let mut dropped = 0usize;
    for (row, score) in rows.iter().zip(scores) {
        let kept = match (row.origin, row.destination, score) {
            (Some(pod), Some(node), Some(score)) => v.insert(pod, node, score),
            _ => false,
        };
        if !kept {
            trace!(
                "{}: dropping row {:?} -> {:?}",
                path.display(),
                row.origin,
                row.destination
            );
            dropped += 1;
        }
    }
    debug!(
        "{}: {} v rows, {} kept, {dropped} dropped",
        path.display(),
        rows.len(),
        v.len()
    );
    Ok(v)
}
