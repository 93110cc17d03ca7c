//! Sampling formant values at proportional points inside an occurrence

use tracing::trace;

use crate::formant::{FormantAnalyzer, FormantIndex};
use crate::occurrence::Occurrence;

/// One analyzer reading for an occurrence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub formant: FormantIndex,
    /// Proportion of the interval's duration, 0 = start, 1 = end
    pub point: f64,
    /// Absolute time the analyzer was queried at
    pub time: f64,
    /// `None` when the analyzer had no value (unvoiced, silence, signal edge)
    pub value: Option<f64>,
}

/// Absolute time of a proportional point within `[start, end]`
///
/// The point is relative to the interval itself: `start + (end - start) * point`.
pub fn query_time(start: f64, end: f64, point: f64) -> f64 {
    start + (end - start) * point
}

/// Query the analyzer for every formant at every point of one occurrence
///
/// Returns exactly `formants.len() * points.len()` samples, formant-major.
/// Missing values are kept as `None` so a voiceless stretch stays
/// distinguishable from a phone that never occurred.
pub fn sample_occurrence<A: FormantAnalyzer + ?Sized>(
    occurrence: &Occurrence<'_>,
    analyzer: &A,
    formants: &[FormantIndex],
    points: &[f64],
) -> Vec<Sample> {
    let (start, end) = (occurrence.start(), occurrence.end());

    formants
        .iter()
        .flat_map(|&formant| {
            points.iter().map(move |&point| {
                let time = query_time(start, end, point);
                let value = analyzer.formant_at(formant, time);
                if value.is_none() {
                    trace!(
                        %formant,
                        time,
                        phone = occurrence.label(),
                        interval = occurrence.index(),
                        "no formant value"
                    );
                }
                Sample {
                    formant,
                    point,
                    time,
                    value,
                }
            })
        })
        .collect()
}
