use std::path::PathBuf;

use thiserror::Error;

/// Broad classes of failure, used to pick the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Io,
    Parse,
    DataIntegrity,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 1,
            ErrorKind::Io => 2,
            ErrorKind::Parse => 3,
            ErrorKind::DataIntegrity => 4,
        }
    }
}

/// Every failure the distance run can report.
///
/// Variants carry the label, frame or path that caused them so the final
/// diagnostic points at the offending input.
#[derive(Error, Debug)]
pub enum DistanceError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}, line {line}: column '{column}' value '{value}' is not a valid number")]
    InvalidNumber {
        path: PathBuf,
        line: usize,
        column: String,
        value: String,
    },

    #[error("{path}, line {line}: frame {value} is negative")]
    NegativeFrame { path: PathBuf, line: usize, value: i64 },

    #[error("line {line}: tracked spot has no FRAME value")]
    MissingFrame { line: usize },

    #[error("no ROI named '{label}' in the ROI index")]
    RoiNotFound { label: String },

    #[error("ROI name '{label}' is ambiguous: {count} entries match")]
    AmbiguousRoi { label: String, count: usize },

    #[error("spot label '{label}' contains no usable numeric identifier")]
    InvalidSpotLabel { label: String },

    #[error("ROI file {path} contains no pixels")]
    EmptyRoi { path: PathBuf },

    #[error("mask for frame {frame} not found at {path}")]
    MaskMissing { frame: u32, path: PathBuf },

    #[error("cannot decode mask {path}: {source}")]
    MaskDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no foreground pixels in any mask from frame {frame} down to frame {min_frame}")]
    NoForeground { frame: u32, min_frame: u32 },

    #[error("cannot write results to {path}: {message}")]
    Output { path: PathBuf, message: String },

    /// A per-spot failure, tagged with the spot it happened on.
    #[error("spot '{label}' ({}): {source}", frame_label(.frame))]
    Spot {
        label: String,
        frame: Option<u32>,
        #[source]
        source: Box<DistanceError>,
    },
}

fn frame_label(frame: &Option<u32>) -> String {
    match frame {
        Some(frame) => format!("frame {frame}"),
        None => "no frame".to_string(),
    }
}

impl DistanceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DistanceError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DistanceError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use DistanceError::*;
        match self {
            Config(_) => ErrorKind::Config,
            Io { .. } | MaskMissing { .. } | MaskDecode { .. } | Output { .. } => ErrorKind::Io,
            Csv { .. }
            | MissingColumn { .. }
            | InvalidNumber { .. }
            | NegativeFrame { .. }
            | MissingFrame { .. } => ErrorKind::Parse,
            RoiNotFound { .. }
            | AmbiguousRoi { .. }
            | InvalidSpotLabel { .. }
            | EmptyRoi { .. }
            | NoForeground { .. } => ErrorKind::DataIntegrity,
            Spot { source, .. } => source.kind(),
        }
    }
}

pub type Result<T, E = DistanceError> = std::result::Result<T, E>;
