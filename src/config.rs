use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DistanceError, Result};

/// Non-data rows that TrackMate writes between the CSV header and the first
/// spot (long names, short names, units).
pub const HEADER_ROW_COUNT: usize = 3;

/// Width of the zero-padded frame number in mask file names (`0005.bmp`).
pub const FRAME_DIGITS: usize = 4;

/// What to do when a single spot cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first failing spot; nothing is written.
    #[default]
    Abort,
    /// Record the failure on that spot's output row and continue.
    Mark,
}

/// Settings for one distance run over an experiment folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub spots_file: String,
    pub rois_file: String,
    pub output_file: String,
    pub header_rows: usize,
    /// Lowest frame the empty-mask fallback may reach (inclusive).
    pub min_frame: u32,
    pub mask_extension: String,
    pub on_error: ErrorPolicy,
    pub cache_masks: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            spots_file: "spots.csv".to_string(),
            rois_file: "rois.csv".to_string(),
            output_file: "result_whole_spot_distance.xlsx".to_string(),
            header_rows: HEADER_ROW_COUNT,
            min_frame: 0,
            mask_extension: "bmp".to_string(),
            on_error: ErrorPolicy::Abort,
            cache_masks: true,
        }
    }
}

impl RunConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DistanceError::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| DistanceError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        let names = [
            ("spots_file", &self.spots_file),
            ("rois_file", &self.rois_file),
            ("output_file", &self.output_file),
            ("mask_extension", &self.mask_extension),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(DistanceError::Config(format!("'{field}' must not be empty")));
            }
        }
        Ok(())
    }

    pub fn mask_file_name(&self, frame: u32) -> String {
        mask_file_name(frame, &self.mask_extension)
    }
}

/// File name of the mask for `frame`, e.g. `0005.bmp`.
pub fn mask_file_name(frame: u32, extension: &str) -> String {
    format!("{frame:0width$}.{extension}", width = FRAME_DIGITS)
}
