//! Whole-folder runs against real files: CSV tables and BMP masks.

use std::fs;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use image::{GrayImage, Luma};
use tempfile::TempDir;

use spot_distance::data::model::ResultRecord;
use spot_distance::{run, DistanceError, ErrorKind, ErrorPolicy, RunConfig};

const SPOT_HEADER: &str = "\
LABEL,ID,TRACK_ID,QUALITY,POSITION_X,POSITION_Y,FRAME
Label,Spot ID,Track ID,Quality,X,Y,Frame
Label,Spot ID,Track ID,Quality,X,Y,Frame
,,,(quality),(micron),(micron),
";

struct Experiment {
    dir: TempDir,
}

impl Experiment {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `rows` are (label, track_id, frame); an empty track id is untracked.
    fn spots(&self, rows: &[(&str, &str, u32)]) -> &Self {
        let mut text = SPOT_HEADER.to_string();
        for (i, (label, track, frame)) in rows.iter().enumerate() {
            text.push_str(&format!("{label},{i},{track},1.0,0.0,0.0,{frame}\n"));
        }
        fs::write(self.path().join("spots.csv"), text).unwrap();
        self
    }

    /// Append a raw data row to `spots.csv`, for cells `spots` cannot express.
    fn spot_line(&self, line: &str) -> &Self {
        let path = self.path().join("spots.csv");
        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str(line);
        text.push('\n');
        fs::write(path, text).unwrap();
        self
    }

    fn rois(&self, rows: &[(&str, &str)]) -> &Self {
        let mut text = String::from(" ,Index,Name\n");
        for (i, (index, name)) in rows.iter().enumerate() {
            text.push_str(&format!("{i},{index},{name}\n"));
        }
        fs::write(self.path().join("rois.csv"), text).unwrap();
        self
    }

    fn roi_pixels(&self, index: &str, pixels: &[(u32, u32)]) -> &Self {
        let mut text = String::from("X,Y\n");
        for (x, y) in pixels {
            text.push_str(&format!("{x},{y}\n"));
        }
        fs::write(self.path().join(format!("{index}.csv")), text).unwrap();
        self
    }

    fn mask(&self, frame: u32, foreground: &[(u32, u32)]) -> &Self {
        let mut image = GrayImage::new(32, 32);
        for &(x, y) in foreground {
            image.put_pixel(x, y, Luma([255]));
        }
        image
            .save(self.path().join(format!("{frame:04}.bmp")))
            .unwrap();
        self
    }

    fn output(&self, name: &str) -> std::path::PathBuf {
        self.path().join(name)
    }
}

fn csv_config() -> RunConfig {
    RunConfig {
        output_file: "result.csv".into(),
        ..Default::default()
    }
}

/// Single spot `id7` → ROI `3.csv` with pixel (10, 10).
fn single_spot() -> Experiment {
    let exp = Experiment::new();
    exp.spots(&[("id7", "0", 5)])
        .rois(&[("3", "id7")])
        .roi_pixels("3", &[(10, 10)]);
    exp
}

#[test]
fn distance_to_mask_in_same_frame() {
    let exp = single_spot();
    exp.mask(5, &[(10, 13)]);

    let report = run(exp.path(), &csv_config()).unwrap();
    assert_eq!(report.records, vec![ResultRecord::measured(7, 3.0)]);

    let text = fs::read_to_string(exp.output("result.csv")).unwrap();
    assert_eq!(text, "SpotID,Distance\n7,3\n");
}

#[test]
fn empty_mask_falls_back_to_previous_frame() {
    let exp = single_spot();
    exp.mask(5, &[]).mask(4, &[(10, 10)]);

    let report = run(exp.path(), &csv_config()).unwrap();
    assert_eq!(report.records, vec![ResultRecord::measured(7, 0.0)]);
    assert_eq!(report.fallbacks, 1);
}

fn read_sheet(path: &Path) -> Vec<Vec<Data>> {
    let mut book: Xlsx<_> = open_workbook(path).unwrap();
    let range = book.worksheet_range_at(0).unwrap().unwrap();
    range.rows().map(<[Data]>::to_vec).collect()
}

#[test]
fn default_output_is_xlsx() {
    let exp = single_spot();
    exp.mask(5, &[(10, 13)]);

    let report = run(exp.path(), &RunConfig::default()).unwrap();
    let output = exp.output("result_whole_spot_distance.xlsx");
    assert_eq!(report.output.as_deref(), Some(output.as_path()));

    let rows = read_sheet(&output);
    assert_eq!(
        rows,
        [
            vec![Data::String("SpotID".into()), Data::String("Distance".into())],
            vec![Data::Float(7.0), Data::Float(3.0)],
        ]
    );
}

#[test]
fn xlsx_keeps_spot_order_and_marks_failures() {
    let exp = Experiment::new();
    exp.spots(&[("id5", "0", 0), ("id9", "1", 0), ("id2", "2", 0)])
        .rois(&[("5", "id5"), ("2", "id2")])
        .roi_pixels("5", &[(0, 0)])
        .roi_pixels("2", &[(6, 4)])
        .mask(0, &[(0, 4)]);

    let config = RunConfig {
        on_error: ErrorPolicy::Mark,
        ..Default::default()
    };
    run(exp.path(), &config).unwrap();

    let rows = read_sheet(&exp.output("result_whole_spot_distance.xlsx"));
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows[0],
        [
            Data::String("SpotID".into()),
            Data::String("Distance".into()),
            Data::String("Error".into()),
        ]
    );
    assert_eq!(rows[1], [Data::Float(5.0), Data::Float(4.0), Data::Empty]);
    assert_eq!(rows[2][0], Data::Float(9.0));
    assert_eq!(rows[2][1], Data::Empty);
    assert!(matches!(&rows[2][2], Data::String(msg) if msg.contains("id9")));
    assert_eq!(rows[3], [Data::Float(2.0), Data::Float(6.0), Data::Empty]);
}

#[test]
fn untracked_row_without_frame_is_skipped() {
    let exp = single_spot();
    exp.spot_line("id8,1,,1.0,0.0,0.0,")
        .spot_line("id9,2,NaN,1.0,0.0,0.0,n/a")
        .mask(5, &[(10, 13)]);

    let report = run(exp.path(), &csv_config()).unwrap();
    assert_eq!(report.records, vec![ResultRecord::measured(7, 3.0)]);
    assert_eq!(report.untracked, 2);
}

#[test]
fn tracked_row_without_frame_names_the_spot() {
    let exp = single_spot();
    exp.spot_line("id8,1,4,1.0,0.0,0.0,").mask(5, &[(10, 13)]);

    let err = run(exp.path(), &csv_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().starts_with("spot 'id8' (no frame)"));
    assert!(!exp.output("result.csv").exists());
}

#[test]
fn untracked_spots_produce_no_row() {
    let exp = Experiment::new();
    exp.spots(&[("id1", "0", 0), ("id2", "", 0), ("id3", "NaN", 0), ("id4", "1", 0)])
        .rois(&[("1", "id1"), ("4", "id4")])
        .roi_pixels("1", &[(0, 0), (1, 0)])
        .roi_pixels("4", &[(20, 20)])
        .mask(0, &[(4, 4)]);

    let report = run(exp.path(), &csv_config()).unwrap();
    let ids: Vec<Option<i64>> = report.records.iter().map(|r| r.spot_id).collect();
    assert_eq!(ids, [Some(1), Some(4)]);
    assert_eq!(report.untracked, 2);
    assert_eq!(report.records[0].distance, Some(5.0));
}

#[test]
fn repeated_runs_are_bit_identical() {
    let exp = Experiment::new();
    exp.spots(&[("s1", "0", 1), ("s2", "0", 1), ("s3", "1", 2)])
        .rois(&[("1", "s1"), ("2", "s2"), ("3", "s3")])
        .roi_pixels("1", &[(3, 7), (4, 7), (5, 8)])
        .roi_pixels("2", &[(30, 1)])
        .roi_pixels("3", &[(16, 16), (17, 16)])
        .mask(1, &[(0, 0), (9, 11), (25, 2)])
        .mask(2, &[]);

    let first = run(exp.path(), &csv_config()).unwrap();
    let second = run(exp.path(), &RunConfig { cache_masks: false, ..csv_config() }).unwrap();
    assert_eq!(first.records.len(), 3);
    for (a, b) in first.records.iter().zip(&second.records) {
        assert_eq!(a.spot_id, b.spot_id);
        assert_eq!(
            a.distance.map(f64::to_bits),
            b.distance.map(f64::to_bits)
        );
    }
}

#[test]
fn missing_mask_aborts_before_writing() {
    let exp = single_spot();

    let err = run(exp.path(), &csv_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("0005.bmp"));
    assert!(!exp.output("result.csv").exists());
}

#[test]
fn duplicate_roi_label_is_data_error() {
    let exp = single_spot();
    exp.rois(&[("3", "id7"), ("4", "id7")]).mask(5, &[(0, 0)]);

    let err = run(exp.path(), &csv_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    assert!(err.to_string().contains("id7"));
    assert!(!exp.output("result.csv").exists());
}

#[test]
fn no_foreground_down_to_floor() {
    let exp = single_spot();
    exp.mask(5, &[]).mask(4, &[]).mask(3, &[(1, 1)]);

    let config = RunConfig {
        min_frame: 4,
        ..csv_config()
    };
    let err = run(exp.path(), &config).unwrap_err();
    match err {
        DistanceError::Spot { source, .. } => assert!(matches!(
            *source,
            DistanceError::NoForeground {
                frame: 5,
                min_frame: 4
            }
        )),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mark_policy_writes_failed_rows() {
    let exp = Experiment::new();
    exp.spots(&[("id1", "0", 0), ("id2", "0", 0)])
        .rois(&[("1", "id1")])
        .roi_pixels("1", &[(2, 2)])
        .mask(0, &[(2, 6)]);

    let config = RunConfig {
        on_error: ErrorPolicy::Mark,
        ..csv_config()
    };
    let report = run(exp.path(), &config).unwrap();
    assert_eq!(report.first_failure(), Some(ErrorKind::DataIntegrity));

    let text = fs::read_to_string(exp.output("result.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "SpotID,Distance,Error");
    assert_eq!(lines[1], "1,4,");
    assert!(lines[2].starts_with("2,,"));
    assert!(lines[2].contains("id2"));
}

#[test]
fn missing_spot_table_is_io_error() {
    let exp = Experiment::new();
    let err = run(exp.path(), &RunConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
