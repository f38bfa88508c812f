//! Mask distance engine.
//!
//! For a frame and an ROI pixel set, finds the closest approach between the
//! ROI and the foreground of that frame's organelle mask. A frame whose mask
//! has no foreground falls back to the nearest earlier frame that does, down
//! to a configured floor.

use std::path::PathBuf;

use image::{DynamicImage, ImageError};
use log::{debug, warn};

use crate::config::mask_file_name;
use crate::data::model::{PixelSet, Point};
use crate::error::{DistanceError, Result};
use crate::spatial::KdTree;

// ---------------------------------------------------------------------------
// Mask sources
// ---------------------------------------------------------------------------

/// Supplies the foreground pixels of the mask for a frame.
///
/// An empty vector means the mask exists but has no foreground. A mask that
/// does not exist must be an error, never an empty vector.
pub trait MaskSource {
    fn foreground(&self, frame: u32) -> Result<Vec<Point>>;
}

/// Masks stored as one image per frame (`0005.bmp`) in a folder.
#[derive(Debug, Clone)]
pub struct FolderMasks {
    folder: PathBuf,
    extension: String,
}

impl FolderMasks {
    pub fn new(folder: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            extension: extension.into(),
        }
    }

    pub fn path_for(&self, frame: u32) -> PathBuf {
        self.folder.join(mask_file_name(frame, &self.extension))
    }
}

impl MaskSource for FolderMasks {
    fn foreground(&self, frame: u32) -> Result<Vec<Point>> {
        let path = self.path_for(frame);
        let image = image::open(&path).map_err(|e| match e {
            ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                DistanceError::MaskMissing {
                    frame,
                    path: path.clone(),
                }
            }
            other => DistanceError::MaskDecode {
                path: path.clone(),
                source: other,
            },
        })?;
        Ok(foreground_pixels(&image))
    }
}

/// Coordinates of every pixel with a non-zero value in any colour channel.
///
/// Image columns become `x` and rows become `y`.
pub fn foreground_pixels(image: &DynamicImage) -> Vec<Point> {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] > 0)
            .map(|(x, y, _)| Point::new(x as f64, y as f64))
            .collect();
    }
    // 16-bit conversion keeps low non-zero values of any source depth non-zero.
    image
        .to_rgb16()
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0.iter().any(|&c| c > 0))
        .map(|(x, y, _)| Point::new(x as f64, y as f64))
        .collect()
}

// ---------------------------------------------------------------------------
// Distance engine
// ---------------------------------------------------------------------------

/// Result of one distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinDistance {
    /// Closest approach in pixel units.
    pub distance: f64,
    /// Frame whose mask was actually used (differs after a fallback).
    pub mask_frame: u32,
}

struct CachedFrame {
    requested: u32,
    resolved: u32,
    tree: KdTree,
}

/// Computes spot-to-mask distances with empty-frame fallback.
///
/// With caching enabled the most recent frame's index is kept, keyed by the
/// requested frame, so consecutive spots in the same frame share one decode.
pub struct MaskDistanceEngine<S> {
    source: S,
    min_frame: u32,
    cache_enabled: bool,
    cache: Option<CachedFrame>,
}

impl<S: MaskSource> MaskDistanceEngine<S> {
    pub fn new(source: S, min_frame: u32) -> Self {
        Self {
            source,
            min_frame,
            cache_enabled: true,
            cache: None,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        if !enabled {
            self.cache = None;
        }
        self
    }

    /// Minimum over `pixels` of the distance to the nearest foreground pixel
    /// of the mask for `frame` (or its fallback frame).
    pub fn min_distance(&mut self, frame: u32, pixels: &PixelSet) -> Result<MinDistance> {
        let floor = self.min_frame.min(frame);
        if let Some(hit) = self
            .cache
            .as_ref()
            .filter(|c| self.cache_enabled && c.requested == frame)
        {
            return measure(&hit.tree, hit.resolved, frame, floor, pixels);
        }

        let (resolved, foreground) = self.locate(frame)?;
        let tree = KdTree::build(&foreground);
        let result = measure(&tree, resolved, frame, floor, pixels)?;
        if self.cache_enabled {
            self.cache = Some(CachedFrame {
                requested: frame,
                resolved,
                tree,
            });
        }
        Ok(result)
    }

    /// Walk back from `frame` to the first mask with foreground pixels.
    ///
    /// A requested frame already below the floor is searched only at itself.
    pub fn locate(&self, frame: u32) -> Result<(u32, Vec<Point>)> {
        let floor = self.min_frame.min(frame);
        let mut current = frame;
        loop {
            let foreground = self.source.foreground(current)?;
            if !foreground.is_empty() {
                if current != frame {
                    warn!("mask for frame {frame} is empty, using frame {current}");
                }
                return Ok((current, foreground));
            }
            if current <= floor {
                return Err(DistanceError::NoForeground {
                    frame,
                    min_frame: floor,
                });
            }
            debug!("mask for frame {current} is empty");
            current -= 1;
        }
    }
}

fn measure(
    tree: &KdTree,
    resolved: u32,
    frame: u32,
    floor: u32,
    pixels: &PixelSet,
) -> Result<MinDistance> {
    let distance = tree
        .min_distance(pixels.iter())
        .ok_or(DistanceError::NoForeground {
            frame,
            min_frame: floor,
        })?;
    Ok(MinDistance {
        distance,
        mask_frame: resolved,
    })
}
