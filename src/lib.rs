//! formant-extract: formant measurements at phone-aligned time points
//!
//! Pairs audio recordings with Praat TextGrid annotations, finds every
//! occurrence of a target phone on each speaker's "phones" tier and samples
//! formant frequencies at proportional points inside each occurrence.
//!
//! # Core Types
//!
//! - [`Sound`] - Audio samples with sample rate
//! - [`FormantTrack`] - LPC-based formant tracks (Burg's method)
//! - [`Grid`] - Parsed annotation tiers and intervals
//! - [`OutputRecord`] - One extracted measurement row
//! - [`ExtractionConfig`] - Validated run configuration
//!
//! # Pipeline
//!
//! [`run_batch`] drives the whole thing: it pairs files by stem, and for each
//! pair selects phone tiers ([`phone_tiers`]), locates occurrences
//! ([`occurrences`]), samples the analyzer ([`sample_occurrence`]) and
//! assembles records ([`extract_from_grid`]).

pub mod annotation;
pub mod batch;
pub mod config;
pub mod formant;
pub mod occurrence;
pub mod output;
pub mod record;
pub mod sampler;
pub mod sound;

pub mod utils;

// Re-export main types at crate root
pub use annotation::{phone_tiers, speaker_id, Grid, Interval, SpeakerTier, Tier};
pub use batch::{extract_pair, run_batch, FileIndex, Pairing};
pub use config::ExtractionConfig;
pub use formant::{FormantAnalyzer, FormantIndex, FormantSettings, FormantTrack};
pub use occurrence::{occurrences, Occurrence};
pub use output::{write_csv, write_records};
pub use record::{extract_from_grid, OutputRecord};
pub use sampler::{query_time, sample_occurrence, Sample};
pub use sound::Sound;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting formants
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decoding error: {0}")]
    WavDecode(#[from] hound::Error),

    #[error("Audio decoding error: {0}")]
    Audio(String),

    #[error("Failed to parse TextGrid '{}': {message}", path.display())]
    Annotation { path: PathBuf, message: String },

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed invocation: bad formant index, bad point, too many points
    #[error("Usage error: {0}")]
    Usage(String),

    /// Inputs that cannot form a batch, e.g. no audio/TextGrid stem pairs
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
