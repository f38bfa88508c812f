use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::{ErrorPolicy, RunConfig};
use crate::data::filter::tracked;
use crate::data::loader::{load_roi_index, load_spots};
use crate::data::model::{clean_spot_id, ResultRecord, SpotRecord};
use crate::error::{DistanceError, ErrorKind, Result};
use crate::mask::{FolderMasks, MaskDistanceEngine, MaskSource, MinDistance};
use crate::output::sink_for;
use crate::roi::RoiResolver;

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Outcome of a complete run over one experiment folder.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One row per tracked spot, in spot-table order.
    pub records: Vec<ResultRecord>,
    /// Spots dropped for lacking a track id.
    pub untracked: usize,
    /// Spots measured against an earlier frame's mask.
    pub fallbacks: usize,
    /// Spot failures recorded under [`ErrorPolicy::Mark`].
    pub failures: Vec<DistanceError>,
    /// Where the table was written, if it was.
    pub output: Option<PathBuf>,
}

impl RunReport {
    /// Kind of the first failed spot, used for the exit code.
    pub fn first_failure(&self) -> Option<ErrorKind> {
        self.failures.first().map(DistanceError::kind)
    }
}

// ---------------------------------------------------------------------------
// Per-spot processing
// ---------------------------------------------------------------------------

/// Spot → identifier, ROI pixels, and closest approach to the mask.
///
/// A tracked spot without a frame is a [`DistanceError::MissingFrame`].
pub fn process_spot<S: MaskSource>(
    spot: &SpotRecord,
    resolver: &RoiResolver,
    engine: &mut MaskDistanceEngine<S>,
) -> Result<(i64, MinDistance)> {
    let spot_id = clean_spot_id(&spot.label)?;
    let frame = spot
        .frame
        .ok_or(DistanceError::MissingFrame { line: spot.line })?;
    let pixels = resolver.resolve(&spot.label)?;
    let measured = engine.min_distance(frame, &pixels)?;
    debug!(
        "spot {} (frame {}, mask {}): {} pixels, distance {}",
        spot.label,
        frame,
        measured.mask_frame,
        pixels.len(),
        measured.distance
    );
    Ok((spot_id, measured))
}

/// Measure every tracked spot, in order.
///
/// Under [`ErrorPolicy::Abort`] the first failing spot ends the run with an
/// error naming it. Under [`ErrorPolicy::Mark`] the failure becomes an
/// explicit failed row and processing continues.
pub fn compute_distances<S: MaskSource>(
    spots: Vec<SpotRecord>,
    resolver: &RoiResolver,
    engine: &mut MaskDistanceEngine<S>,
    policy: ErrorPolicy,
) -> Result<RunReport> {
    let total = spots.len();
    let spots = tracked(spots);
    let mut report = RunReport {
        untracked: total - spots.len(),
        ..Default::default()
    };

    for spot in &spots {
        match process_spot(spot, resolver, engine) {
            Ok((spot_id, measured)) => {
                if Some(measured.mask_frame) != spot.frame {
                    report.fallbacks += 1;
                }
                report
                    .records
                    .push(ResultRecord::measured(spot_id, measured.distance));
            }
            Err(source) => {
                let message = source.to_string();
                let err = DistanceError::Spot {
                    label: spot.label.clone(),
                    frame: spot.frame,
                    source: Box::new(source),
                };
                match policy {
                    ErrorPolicy::Abort => return Err(err),
                    ErrorPolicy::Mark => {
                        warn!("{err}");
                        report
                            .records
                            .push(ResultRecord::failed(clean_spot_id(&spot.label).ok(), message));
                        report.failures.push(err);
                    }
                }
            }
        }
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// Folder entry point
// ---------------------------------------------------------------------------

/// Run the whole folder: load the tables, measure every tracked spot, and
/// write the result table once at the end.
///
/// Nothing is written if loading fails or a spot fails under
/// [`ErrorPolicy::Abort`].
pub fn run(folder: &Path, config: &RunConfig) -> Result<RunReport> {
    config.validate()?;
    info!("processing {}", folder.display());

    let spots = load_spots(&folder.join(&config.spots_file), config.header_rows)?;
    let resolver = RoiResolver::new(folder, load_roi_index(&folder.join(&config.rois_file))?);
    let masks = FolderMasks::new(folder, config.mask_extension.as_str());
    let mut engine = MaskDistanceEngine::new(masks, config.min_frame).with_cache(config.cache_masks);

    let mut report = compute_distances(spots, &resolver, &mut engine, config.on_error)?;

    let output = folder.join(&config.output_file);
    sink_for(&output).write(&report.records)?;
    report.output = Some(output);

    info!(
        "{} spots measured ({} via earlier frame), {} failed, {} untracked skipped",
        report.records.len() - report.failures.len(),
        report.fallbacks,
        report.failures.len(),
        report.untracked
    );
    Ok(report)
}
