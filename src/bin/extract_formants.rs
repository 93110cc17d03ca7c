//! CLI for batch formant extraction at phone-aligned points.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use std::path::PathBuf;
use tracing::Level;

use formant_extract::{run_batch, write_csv, ExtractError, ExtractionConfig, FormantIndex};

#[derive(Parser)]
#[command(name = "extract-formants")]
#[command(about = "Extract formant values at proportional points of a target phone")]
struct Cli {
    /// Directory of .wav recordings
    #[arg(long = "audio_path")]
    audio_path: PathBuf,

    /// Directory of .TextGrid annotations, paired with recordings by file stem
    #[arg(long = "textgrids_path")]
    textgrids_path: PathBuf,

    /// Output CSV path
    #[arg(long)]
    output: PathBuf,

    /// Phone label to measure (exact match)
    #[arg(long)]
    phone: String,

    /// Formants to measure, 1-4 (or f1-f4)
    #[arg(long, num_args = 1.., required = true)]
    formants: Vec<FormantIndex>,

    /// Proportional points within each phone, at most 3, each in [0, 1]
    #[arg(long, num_args = 1.., required = true, allow_negative_numbers = true)]
    points: Vec<f64>,

    /// Formant analysis ceiling in Hz
    #[arg(long, default_value = "5000")]
    max_formant: f64,

    /// Skip files that fail to process instead of stopping
    #[arg(long)]
    keep_going: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> ExtractionConfig {
        let mut config = ExtractionConfig::new(
            self.audio_path,
            self.textgrids_path,
            self.output,
            self.phone,
            self.formants,
            self.points,
        );
        config.settings.max_formant_hz = self.max_formant;
        config.keep_going = self.keep_going;
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.into_config();
    match config.validate() {
        Ok(()) => {}
        Err(err @ (ExtractError::Usage(_) | ExtractError::InvalidParameter(_))) => {
            Cli::command()
                .error(ErrorKind::ValueValidation, err)
                .exit();
        }
        Err(err) => return Err(err.into()),
    }

    let records = run_batch(&config).context("Extraction failed")?;
    write_csv(&config.output, &records, &config.formants).with_context(|| {
        format!("Failed to write {}", config.output.display())
    })?;

    println!("Formant data written to {}", config.output.display());
    Ok(())
}
