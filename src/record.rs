//! Output records and the per-file extraction pipeline

use tracing::debug;

use crate::annotation::{phone_tiers, Grid};
use crate::formant::{FormantAnalyzer, FormantIndex};
use crate::occurrence::{occurrences, Occurrence};
use crate::sampler::{sample_occurrence, Sample};

/// One measurement: a formant at a proportional point of one phone occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub speaker: String,
    pub phone: String,
    /// `None` when the occurrence is the first interval of its tier
    pub preceding_phone: Option<String>,
    /// `None` when the occurrence is the last interval of its tier
    pub following_phone: Option<String>,
    pub point: f64,
    pub interval_start: f64,
    pub interval_end: f64,
    pub formant: FormantIndex,
    /// `None` when the analyzer produced no value
    pub value: Option<f64>,
}

impl OutputRecord {
    /// Combine an occurrence's context with one sample
    pub fn assemble(speaker: &str, occurrence: &Occurrence<'_>, sample: Sample) -> Self {
        Self {
            speaker: speaker.to_string(),
            phone: occurrence.label().to_string(),
            preceding_phone: occurrence.preceding().map(str::to_string),
            following_phone: occurrence.following().map(str::to_string),
            point: sample.point,
            interval_start: occurrence.start(),
            interval_end: occurrence.end(),
            formant: sample.formant,
            value: sample.value,
        }
    }
}

/// Extract records for one annotation grid against one analyzer
///
/// Rows come out tier by tier (grid order), then occurrence, formant and
/// point. Every combination yields a row, missing values included.
pub fn extract_from_grid<A: FormantAnalyzer + ?Sized>(
    grid: &Grid,
    analyzer: &A,
    phone: &str,
    formants: &[FormantIndex],
    points: &[f64],
) -> Vec<OutputRecord> {
    let mut records = Vec::new();

    for selected in phone_tiers(grid) {
        let before = records.len();
        for occurrence in occurrences(selected.tier, phone) {
            records.extend(
                sample_occurrence(&occurrence, analyzer, formants, points)
                    .into_iter()
                    .map(|sample| OutputRecord::assemble(&selected.speaker, &occurrence, sample)),
            );
        }
        debug!(
            speaker = %selected.speaker,
            tier = %selected.tier.name,
            records = records.len() - before,
            "tier processed"
        );
    }

    records
}
