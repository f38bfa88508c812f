use log::debug;

use super::model::SpotRecord;

/// Keep only spots that belong to a track.
///
/// A spot without a `TRACK_ID` is not an error: it is dropped here and
/// produces no output row. This is the only filtering rule applied to the
/// spot table.
pub fn tracked(spots: Vec<SpotRecord>) -> Vec<SpotRecord> {
    let total = spots.len();
    let kept: Vec<SpotRecord> = spots
        .into_iter()
        .filter(|spot| {
            if !spot.is_tracked() {
                debug!("skipping untracked spot '{}' (line {})", spot.label, spot.line);
            }
            spot.is_tracked()
        })
        .collect();
    debug!("{} of {total} spots are tracked", kept.len());
    kept
}
