use std::fmt;

use crate::error::{DistanceError, Result};

// ---------------------------------------------------------------------------
// SpotRecord – one row of the spot table
// ---------------------------------------------------------------------------

/// A detected spot in one frame, as read from the spot table.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotRecord {
    /// Time index of the frame the spot was detected in. `None` when the
    /// cell is empty, which only matters for tracked spots.
    pub frame: Option<u32>,
    /// Track the spot belongs to; `None` when the tracker left it unlinked.
    pub track_id: Option<i64>,
    /// Display label, used both for ROI lookup and the output identifier.
    pub label: String,
    /// 1-based line in the source file, for diagnostics.
    pub line: usize,
}

impl SpotRecord {
    pub fn is_tracked(&self) -> bool {
        self.track_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// RoiEntry – one row of the ROI index
// ---------------------------------------------------------------------------

/// Maps a spot label to the stem of its pixel-coordinate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiEntry {
    pub label: String,
    /// Compared and used as text: `3` refers to `3.csv`.
    pub file_index: String,
}

// ---------------------------------------------------------------------------
// Point / PixelSet – 2D pixel coordinates
// ---------------------------------------------------------------------------

/// A 2D point in pixel units. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn get(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            _ => self.y,
        }
    }

    #[inline]
    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The pixels making up one spot's region of interest, in file order.
/// Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSet {
    points: Vec<Point>,
}

impl PixelSet {
    /// Returns `None` for an empty point list.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }
}

// ---------------------------------------------------------------------------
// ResultRecord – one output row
// ---------------------------------------------------------------------------

/// Output row for one processed spot.
///
/// A successful row has a distance and no error. A failed row (only produced
/// under the `mark` error policy) has no distance and carries the diagnostic;
/// its `spot_id` is `None` when the label itself could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub spot_id: Option<i64>,
    pub distance: Option<f64>,
    pub error: Option<String>,
}

impl ResultRecord {
    pub fn measured(spot_id: i64, distance: f64) -> Self {
        Self {
            spot_id: Some(spot_id),
            distance: Some(distance),
            error: None,
        }
    }

    pub fn failed(spot_id: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            spot_id,
            distance: None,
            error: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Spot identifier cleaning
// ---------------------------------------------------------------------------

/// Derive the numeric spot identifier from a label by dropping every
/// non-digit character: `"spot_42"` → 42, `"ID1a2"` → 12.
///
/// A label without digits, or whose digits overflow `i64`, is an error.
pub fn clean_spot_id(label: &str) -> Result<i64> {
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(DistanceError::InvalidSpotLabel {
            label: label.to_string(),
        });
    }
    digits
        .parse::<i64>()
        .map_err(|_| DistanceError::InvalidSpotLabel {
            label: label.to_string(),
        })
}
