use std::collections::HashMap;
use std::path::PathBuf;

use crate::data::loader::load_pixels;
use crate::data::model::{PixelSet, RoiEntry};
use crate::error::{DistanceError, Result};

/// Resolves a spot label to the pixels of its ROI.
///
/// Built once from the ROI index; label matching is exact and
/// case-sensitive. Pixel files are read on every call, never cached.
#[derive(Debug, Clone)]
pub struct RoiResolver {
    folder: PathBuf,
    by_label: HashMap<String, Vec<String>>,
}

impl RoiResolver {
    pub fn new(folder: impl Into<PathBuf>, entries: Vec<RoiEntry>) -> Self {
        let mut by_label: HashMap<String, Vec<String>> = HashMap::new();
        for entry in entries {
            by_label
                .entry(entry.label)
                .or_default()
                .push(entry.file_index);
        }
        Self {
            folder: folder.into(),
            by_label,
        }
    }

    /// Path of the pixel file for `label`.
    ///
    /// Zero matches and more than one match are both data-integrity errors;
    /// duplicate labels are never resolved by picking one.
    pub fn pixel_file(&self, label: &str) -> Result<PathBuf> {
        match self.by_label.get(label).map(Vec::as_slice) {
            None | Some([]) => Err(DistanceError::RoiNotFound {
                label: label.to_string(),
            }),
            Some([index]) => Ok(self.folder.join(format!("{index}.csv"))),
            Some(many) => Err(DistanceError::AmbiguousRoi {
                label: label.to_string(),
                count: many.len(),
            }),
        }
    }

    /// Load the pixel set for `label`.
    pub fn resolve(&self, label: &str) -> Result<PixelSet> {
        load_pixels(&self.pixel_file(label)?)
    }
}
