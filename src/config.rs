//! Run configuration for a batch extraction

use std::path::PathBuf;

use crate::formant::{FormantIndex, FormantSettings, MIN_MAX_FORMANT_HZ};
use crate::{ExtractError, Result};

/// Most proportional points accepted per run
pub const MAX_POINTS: usize = 3;

/// Everything one extraction run needs, passed explicitly through the pipeline
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Directory holding the `.wav` recordings
    pub audio_dir: PathBuf,
    /// Directory holding the `.TextGrid` annotations
    pub textgrid_dir: PathBuf,
    pub output: PathBuf,
    /// Target phone label, matched exactly
    pub phone: String,
    pub formants: Vec<FormantIndex>,
    /// Proportional points in `[0, 1]`
    pub points: Vec<f64>,
    pub settings: FormantSettings,
    /// Skip files that fail instead of aborting the batch
    pub keep_going: bool,
}

impl ExtractionConfig {
    pub fn new(
        audio_dir: impl Into<PathBuf>,
        textgrid_dir: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        phone: impl Into<String>,
        formants: Vec<FormantIndex>,
        points: Vec<f64>,
    ) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            textgrid_dir: textgrid_dir.into(),
            output: output.into(),
            phone: phone.into(),
            formants,
            points,
            settings: FormantSettings::default(),
            keep_going: false,
        }
    }

    /// Reject malformed invocations; touches no files
    pub fn validate(&self) -> Result<()> {
        if self.phone.is_empty() {
            return Err(ExtractError::Usage("target phone must not be empty".into()));
        }
        if self.formants.is_empty() {
            return Err(ExtractError::Usage("at least one formant is required".into()));
        }
        if self.points.is_empty() {
            return Err(ExtractError::Usage("at least one point is required".into()));
        }
        if self.points.len() > MAX_POINTS {
            return Err(ExtractError::Usage(format!(
                "at most {MAX_POINTS} points may be given, got {}",
                self.points.len()
            )));
        }
        if let Some(bad) = self.points.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ExtractError::Usage(format!(
                "point {bad} is outside [0, 1]"
            )));
        }
        let ceiling = self.settings.max_formant_hz;
        if !(ceiling.is_finite() && ceiling >= MIN_MAX_FORMANT_HZ) {
            return Err(ExtractError::InvalidParameter(format!(
                "maximum formant must be at least {MIN_MAX_FORMANT_HZ} Hz, got {ceiling}"
            )));
        }
        Ok(())
    }
}
