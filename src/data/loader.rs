use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use log::debug;

use super::model::{PixelSet, Point, RoiEntry, SpotRecord};
use crate::error::{DistanceError, Result};

// ---------------------------------------------------------------------------
// Spot table
// ---------------------------------------------------------------------------

/// Load the spot table (TrackMate `spots.csv` export).
///
/// Layout: one header row with column names, then `header_rows` non-data
/// rows (names, short names, units) which are dropped, then one row per
/// spot. Required columns: `LABEL`, `FRAME`, `TRACK_ID`.
///
/// Cells are decoded lossily, since unit rows may hold non-UTF-8 bytes.
/// A `TRACK_ID` that is empty or `NaN` yields `track_id: None`, and the
/// `FRAME` of such a row is never validated. For tracked rows an empty
/// `FRAME` yields `frame: None`; any other non-numeric `FRAME` or
/// `TRACK_ID` is an error.
pub fn load_spots(path: &Path, header_rows: usize) -> Result<Vec<SpotRecord>> {
    let mut table = Table::open(path)?;
    let label_idx = table.column("LABEL")?;
    let frame_idx = table.column("FRAME")?;
    let track_idx = table.column("TRACK_ID")?;

    let mut spots = Vec::new();
    let mut record = ByteRecord::new();
    let mut data_row = 0usize;
    while let Some(line) = table.next_record(&mut record)? {
        data_row += 1;
        if data_row <= header_rows {
            continue;
        }

        let label = cell(&record, label_idx).into_owned();
        let track_id = parse_track_id(path, line, &cell(&record, track_idx))?;
        let raw_frame = cell(&record, frame_idx);
        let frame = match track_id {
            Some(_) => parse_frame(path, line, &raw_frame)?,
            // dropped by the track filter; a bad frame here is irrelevant
            None => parse_frame(path, line, &raw_frame).ok().flatten(),
        };

        spots.push(SpotRecord {
            frame,
            track_id,
            label,
            line,
        });
    }

    debug!("{}: {} spot rows", path.display(), spots.len());
    Ok(spots)
}

fn parse_frame(path: &Path, line: usize, raw: &str) -> Result<Option<u32>> {
    if is_absent(raw) {
        return Ok(None);
    }
    let value = parse_integral(raw).ok_or_else(|| invalid(path, line, "FRAME", raw))?;
    if value < 0 {
        return Err(DistanceError::NegativeFrame {
            path: path.to_path_buf(),
            line,
            value,
        });
    }
    u32::try_from(value)
        .map(Some)
        .map_err(|_| invalid(path, line, "FRAME", raw))
}

fn parse_track_id(path: &Path, line: usize, raw: &str) -> Result<Option<i64>> {
    if is_absent(raw) {
        return Ok(None);
    }
    parse_integral(raw)
        .map(Some)
        .ok_or_else(|| invalid(path, line, "TRACK_ID", raw))
}

/// Empty cell or pandas-style `NaN`.
fn is_absent(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Accept `"5"` as well as integral floats such as `"5.0"`.
fn parse_integral(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// ROI index
// ---------------------------------------------------------------------------

/// Load the ROI index (`rois.csv`): columns `Name` and `Index`.
///
/// `Index` is kept as text; it is the stem of the ROI's pixel file.
pub fn load_roi_index(path: &Path) -> Result<Vec<RoiEntry>> {
    let mut table = Table::open(path)?;
    let name_idx = table.column("Name")?;
    let index_idx = table.column("Index")?;

    let mut entries = Vec::new();
    let mut record = ByteRecord::new();
    while table.next_record(&mut record)?.is_some() {
        entries.push(RoiEntry {
            label: cell(&record, name_idx).into_owned(),
            file_index: cell(&record, index_idx).trim().to_string(),
        });
    }

    debug!("{}: {} ROI entries", path.display(), entries.len());
    Ok(entries)
}

// ---------------------------------------------------------------------------
// ROI pixel file
// ---------------------------------------------------------------------------

/// Load one ROI's pixel coordinates: columns `X` and `Y`, any extra columns
/// ignored. Order of rows is preserved; a file without rows is an error.
pub fn load_pixels(path: &Path) -> Result<PixelSet> {
    let mut table = Table::open(path)?;
    let x_idx = table.column("X")?;
    let y_idx = table.column("Y")?;

    let mut points = Vec::new();
    let mut record = ByteRecord::new();
    while let Some(line) = table.next_record(&mut record)? {
        let x = parse_coord(path, line, "X", &cell(&record, x_idx))?;
        let y = parse_coord(path, line, "Y", &cell(&record, y_idx))?;
        points.push(Point::new(x, y));
    }

    PixelSet::new(points).ok_or_else(|| DistanceError::EmptyRoi {
        path: path.to_path_buf(),
    })
}

fn parse_coord(path: &Path, line: usize, column: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(path, line, column, raw))
}

// ---------------------------------------------------------------------------
// Shared CSV plumbing
// ---------------------------------------------------------------------------

/// A headed CSV file read record by record.
struct Table<'a> {
    path: &'a Path,
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl<'a> Table<'a> {
    fn open(path: &'a Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DistanceError::io(path, e))?;
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
        let headers = reader
            .byte_headers()
            .map_err(|e| DistanceError::csv(path, e))?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();
        Ok(Self {
            path,
            reader,
            headers,
        })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DistanceError::MissingColumn {
                path: self.path.to_path_buf(),
                column: name.to_string(),
            })
    }

    /// Read the next record; returns its 1-based line number, or `None` at EOF.
    fn next_record(&mut self, record: &mut ByteRecord) -> Result<Option<usize>> {
        let more = self
            .reader
            .read_byte_record(record)
            .map_err(|e| DistanceError::csv(self.path, e))?;
        if !more {
            return Ok(None);
        }
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        Ok(Some(line))
    }
}

/// Field `idx` of a record; missing trailing fields read as empty.
fn cell(record: &ByteRecord, idx: usize) -> Cow<'_, str> {
    String::from_utf8_lossy(record.get(idx).unwrap_or_default())
}

fn invalid(path: &Path, line: usize, column: &str, raw: &str) -> DistanceError {
    DistanceError::InvalidNumber {
        path: path.to_path_buf(),
        line,
        column: column.to_string(),
        value: raw.to_string(),
    }
}
