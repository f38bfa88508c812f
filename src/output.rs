use std::path::{Path, PathBuf};

use log::info;
use rust_xlsxwriter::Workbook;

use crate::data::model::ResultRecord;
use crate::error::{DistanceError, Result};

pub const SPOT_ID_HEADER: &str = "SpotID";
pub const DISTANCE_HEADER: &str = "Distance";
pub const ERROR_HEADER: &str = "Error";

/// Destination for the finished result table. Written once per run.
pub trait ResultSink {
    fn write(&mut self, records: &[ResultRecord]) -> Result<()>;
}

/// Pick a sink from the output file extension: `.csv` writes CSV, anything
/// else writes an Excel workbook.
pub fn sink_for(path: &Path) -> Box<dyn ResultSink> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Box::new(CsvSink::new(path))
    } else {
        Box::new(XlsxSink::new(path))
    }
}

/// Column headers for a result table; the error column only appears when a
/// row actually failed.
fn headers(records: &[ResultRecord]) -> Vec<&'static str> {
    let mut headers = vec![SPOT_ID_HEADER, DISTANCE_HEADER];
    if records.iter().any(ResultRecord::is_failed) {
        headers.push(ERROR_HEADER);
    }
    headers
}

// ---------------------------------------------------------------------------
// Excel
// ---------------------------------------------------------------------------

/// Single-sheet workbook, header row then one row per record, no index column.
pub struct XlsxSink {
    path: PathBuf,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn fail(&self, err: impl ToString) -> DistanceError {
        DistanceError::Output {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

impl ResultSink for XlsxSink {
    fn write(&mut self, records: &[ResultRecord]) -> Result<()> {
        let headers = headers(records);
        let with_errors = headers.len() > 2;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in (0u16..).zip(&headers) {
            sheet.write_string(0, col, *name).map_err(|e| self.fail(e))?;
        }

        for (row, record) in (1u32..).zip(records) {
            if let Some(id) = record.spot_id {
                sheet
                    .write_number(row, 0, id as f64)
                    .map_err(|e| self.fail(e))?;
            }
            if let Some(distance) = record.distance {
                sheet
                    .write_number(row, 1, distance)
                    .map_err(|e| self.fail(e))?;
            }
            if with_errors {
                if let Some(message) = &record.error {
                    sheet
                        .write_string(row, 2, message.as_str())
                        .map_err(|e| self.fail(e))?;
                }
            }
        }

        workbook.save(&self.path).map_err(|e| self.fail(e))?;
        info!("wrote {} rows to {}", records.len(), self.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for CsvSink {
    fn write(&mut self, records: &[ResultRecord]) -> Result<()> {
        let headers = headers(records);
        let with_errors = headers.len() > 2;
        let fail = |e: csv::Error| DistanceError::Output {
            path: self.path.clone(),
            message: e.to_string(),
        };

        let mut writer = csv::Writer::from_path(&self.path).map_err(fail)?;
        writer.write_record(&headers).map_err(fail)?;
        for record in records {
            let mut row = vec![
                record.spot_id.map(|id| id.to_string()).unwrap_or_default(),
                record.distance.map(|d| d.to_string()).unwrap_or_default(),
            ];
            if with_errors {
                row.push(record.error.clone().unwrap_or_default());
            }
            writer.write_record(&row).map_err(fail)?;
        }
        writer
            .flush()
            .map_err(|e| DistanceError::io(&self.path, e))?;

        info!("wrote {} rows to {}", records.len(), self.path.display());
        Ok(())
    }
}
