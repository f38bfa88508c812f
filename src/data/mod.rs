/// Data layer: input records, table loading, and filtering.
///
/// Architecture:
/// ```text
///  spots.csv        rois.csv        <Index>.csv
///      │                │                │
///      ▼                ▼                ▼
///   ┌──────────────────────────────────────┐
///   │  loader   parse tables → records     │
///   └──────────────────────────────────────┘
///      │                │                │
///      ▼                ▼                ▼
///  Vec<SpotRecord>  Vec<RoiEntry>     PixelSet
///      │
///      ▼
///   ┌──────────┐
///   │  filter   │  drop spots without a TRACK_ID
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
