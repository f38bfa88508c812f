use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};

use spot_distance::config::{mask_file_name, HEADER_ROW_COUNT};

const WIDTH: u32 = 128;
const HEIGHT: u32 = 128;
const FRAMES: u32 = 6;
const TRACKS: u32 = 4;
const ROI_RADIUS: i64 = 2;
/// This frame's mask is left empty so runs exercise the fallback.
const EMPTY_FRAME: u32 = 3;

/// SplitMix64: enough randomness to scatter spots and mask blobs, and the
/// same folder for the same seed.
struct FixtureRng(u64);

impl FixtureRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform integer in `lo..hi`.
    fn range(&mut self, lo: u32, hi: u32) -> u32 {
        lo + (self.next_u64() % u64::from(hi - lo)) as u32
    }
}

/// Pixels of a filled disc clipped to the image.
fn disc(cx: u32, cy: u32, radius: i64) -> Vec<(u32, u32)> {
    let mut pixels = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let x = i64::from(cx) + dx;
            let y = i64::from(cy) + dy;
            if (0..i64::from(WIDTH)).contains(&x) && (0..i64::from(HEIGHT)).contains(&y) {
                pixels.push((x as u32, y as u32));
            }
        }
    }
    pixels
}

fn write_mask(folder: &Path, frame: u32, rng: &mut FixtureRng) -> anyhow::Result<()> {
    let mut image = GrayImage::new(WIDTH, HEIGHT);
    if frame != EMPTY_FRAME {
        // a few elongated blobs standing in for mitochondria
        for _ in 0..5 {
            let x0 = rng.range(0, WIDTH - 20);
            let y0 = rng.range(0, HEIGHT - 6);
            let len = rng.range(8, 20);
            for x in x0..x0 + len {
                for y in y0..y0 + 3 {
                    image.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }
    image.save(folder.join(mask_file_name(frame, "bmp")))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let folder = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_experiment"));
    std::fs::create_dir_all(&folder)?;

    let mut rng = FixtureRng(42);

    for frame in 0..FRAMES {
        write_mask(&folder, frame, &mut rng)?;
    }

    let mut spots = csv::Writer::from_path(folder.join("spots.csv"))?;
    let mut rois = csv::Writer::from_path(folder.join("rois.csv"))?;
    spots.write_record(["LABEL", "ID", "TRACK_ID", "QUALITY", "POSITION_X", "POSITION_Y", "FRAME"])?;
    let header_rows = [
        ["Label", "Spot ID", "Track ID", "Quality", "X", "Y", "Frame"],
        ["Label", "Spot ID", "Track ID", "Quality", "X", "Y", "Frame"],
        ["", "", "", "(quality)", "(pixel)", "(pixel)", ""],
    ];
    debug_assert_eq!(header_rows.len(), HEADER_ROW_COUNT);
    for row in header_rows {
        spots.write_record(row)?;
    }
    rois.write_record(["Index", "Name"])?;

    let mut spot_id = 0u32;
    for track in 0..=TRACKS {
        // the last "track" holds unlinked spots with an empty TRACK_ID
        let track_id = if track < TRACKS { track.to_string() } else { String::new() };
        let mut cx = rng.range(10, WIDTH - 10);
        let mut cy = rng.range(10, HEIGHT - 10);

        for frame in 0..FRAMES {
            let label = format!("ID{spot_id}");
            spots.write_record([
                label.clone(),
                spot_id.to_string(),
                track_id.clone(),
                "1.0".to_string(),
                cx.to_string(),
                cy.to_string(),
                frame.to_string(),
            ])?;

            let index = spot_id + 1;
            rois.write_record([index.to_string(), label])?;

            let mut pixels = csv::Writer::from_path(folder.join(format!("{index}.csv")))?;
            pixels.write_record(["X", "Y"])?;
            for (x, y) in disc(cx, cy, ROI_RADIUS) {
                pixels.write_record([x.to_string(), y.to_string()])?;
            }
            pixels.flush()?;

            spot_id += 1;
            cx = (cx + rng.range(0, 5)).saturating_sub(2).clamp(3, WIDTH - 4);
            cy = (cy + rng.range(0, 5)).saturating_sub(2).clamp(3, HEIGHT - 4);
        }
    }
    spots.flush()?;
    rois.flush()?;

    println!(
        "Wrote {spot_id} spots over {FRAMES} frames (frame {EMPTY_FRAME} mask empty) to {}",
        folder.display()
    );
    Ok(())
}
