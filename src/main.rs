use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use spot_distance::{run, DistanceError, ErrorPolicy, RunConfig};

/// Minimum distance from each tracked spot's ROI to the mitochondria mask.
///
/// Exit codes: 0 success, 1 configuration, 2 I/O, 3 parse, 4 data integrity.
#[derive(Parser)]
#[command(name = "spot-distance")]
#[command(version)]
struct Cli {
    /// Experiment folder. Prompted for on stdin when omitted.
    folder: Option<PathBuf>,

    /// JSON file with run settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Non-data rows after the spot table header to drop.
    #[arg(long)]
    header_rows: Option<usize>,

    /// Lowest frame the empty-mask fallback may reach.
    #[arg(long)]
    min_frame: Option<u32>,

    /// Output file name inside the folder (.xlsx or .csv).
    #[arg(long)]
    output: Option<String>,

    /// Record failing spots as marked rows instead of aborting.
    #[arg(long)]
    keep_going: bool,

    /// Decode the mask again for every spot.
    #[arg(long)]
    no_cache: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match try_main(cli) {
        Ok(code) => ExitCode::from(code),
        // DistanceError messages already embed their cause.
        Err(err) => match err.downcast_ref::<DistanceError>() {
            Some(e) => {
                eprintln!("error: {e}");
                ExitCode::from(e.kind().exit_code())
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::from(1)
            }
        },
    }
}

fn try_main(cli: Cli) -> Result<u8> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_json_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(rows) = cli.header_rows {
        config.header_rows = rows;
    }
    if let Some(frame) = cli.min_frame {
        config.min_frame = frame;
    }
    if let Some(output) = cli.output {
        config.output_file = output;
    }
    if cli.keep_going {
        config.on_error = ErrorPolicy::Mark;
    }
    if cli.no_cache {
        config.cache_masks = false;
    }

    let folder = match cli.folder {
        Some(folder) => folder,
        None => prompt_folder()?,
    };

    let report = run(&folder, &config)?;

    if let Some(kind) = report.first_failure() {
        eprintln!(
            "{} spot(s) failed; see the Error column of the output",
            report.failures.len()
        );
        return Ok(kind.exit_code());
    }
    Ok(0)
}

fn prompt_folder() -> Result<PathBuf> {
    print!("Enter the folder: ");
    io::stdout().flush().context("writing prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading folder from stdin")?;

    let folder = line.trim();
    if folder.is_empty() {
        return Err(DistanceError::Config("no folder given".into()).into());
    }
    Ok(PathBuf::from(folder))
}
