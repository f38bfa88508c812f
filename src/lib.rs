//! Minimum distance from tracked spots to a time-lapse organelle mask.
//!
//! ```text
//!  spots.csv ──► loader ──► filter ──┐
//!                                    │ (frame, label)
//!  rois.csv ──► RoiResolver ◄────────┤
//!                   │ PixelSet       │
//!                   ▼                ▼
//!  NNNN.bmp ──► MaskDistanceEngine (fallback + k-d tree)
//!                   │ distance
//!                   ▼
//!              ResultSink ──► result_whole_spot_distance.xlsx
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod mask;
pub mod output;
pub mod pipeline;
pub mod roi;
pub mod spatial;

pub use config::{ErrorPolicy, RunConfig};
pub use error::{DistanceError, ErrorKind};
pub use pipeline::{run, RunReport};
