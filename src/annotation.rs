//! Phone annotations: tiers of labelled intervals from Praat TextGrids
//!
//! A [`Grid`] is the ordered list of tiers in one TextGrid. Forced aligners
//! write one "`<speaker> - phones`" tier per speaker next to the word tiers;
//! [`phone_tiers`] picks those out and derives the speaker identifier.

use std::path::Path;

use crate::{ExtractError, Result};

/// Substring that marks a tier as a phone tier (case-sensitive)
pub const PHONES_MARKER: &str = "phones";

/// Suffix removed from a phone tier name to get the speaker identifier
pub const SPEAKER_SUFFIX: &str = "- phones";

/// A labelled time span `[start, end)` in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    pub label: String,
}

impl Interval {
    pub fn new(start: f64, end: f64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A named tier; intervals are in time order
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub name: String,
    pub intervals: Vec<Interval>,
}

impl Tier {
    pub fn new(name: impl Into<String>, intervals: Vec<Interval>) -> Self {
        Self {
            name: name.into(),
            intervals,
        }
    }
}

/// All tiers of one annotation file, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub tiers: Vec<Tier>,
}

impl Grid {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    /// Parse a Praat TextGrid file (long or short text format)
    ///
    /// Point tiers carry no intervals and come through empty.
    pub fn from_textgrid_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let textgrid = textgrid::TextGrid::from_file(path).map_err(|err| ExtractError::Annotation {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let tiers = textgrid
            .tiers
            .into_iter()
            .map(|tier| Tier {
                name: tier.name,
                intervals: tier
                    .intervals
                    .into_iter()
                    .map(|interval| Interval {
                        start: interval.xmin,
                        end: interval.xmax,
                        label: interval.text,
                    })
                    .collect(),
            })
            .collect();

        Ok(Self { tiers })
    }
}

/// A phone tier together with the speaker it belongs to
#[derive(Debug, Clone)]
pub struct SpeakerTier<'a> {
    pub speaker: String,
    pub tier: &'a Tier,
}

/// Derive the speaker identifier from a phone tier name
///
/// Every `"- phones"` is removed and surrounding whitespace trimmed, so
/// `"spk1 - phones"` becomes `"spk1"`. A name that is only `"phones"` keeps
/// it, since the marker alone is not a suffix.
pub fn speaker_id(tier_name: &str) -> String {
    tier_name.replace(SPEAKER_SUFFIX, "").trim().to_string()
}

/// Whether a tier holds a speaker's phone sequence
pub fn is_phone_tier(tier_name: &str) -> bool {
    tier_name.contains(PHONES_MARKER)
}

/// Phone tiers of a grid, in grid order, each with its speaker identifier
///
/// A grid without phone tiers simply yields nothing.
pub fn phone_tiers(grid: &Grid) -> impl Iterator<Item = SpeakerTier<'_>> {
    grid.tiers
        .iter()
        .filter(|tier| is_phone_tier(&tier.name))
        .map(|tier| SpeakerTier {
            speaker: speaker_id(&tier.name),
            tier,
        })
}
