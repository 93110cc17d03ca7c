//! Locating occurrences of a target phone within a tier

use crate::annotation::{Interval, Tier};

/// One interval of a tier whose label matched the target phone
///
/// Keeps its position so the neighbouring labels can be looked up.
#[derive(Debug, Clone, Copy)]
pub struct Occurrence<'a> {
    tier: &'a Tier,
    index: usize,
}

impl<'a> Occurrence<'a> {
    pub fn interval(&self) -> &'a Interval {
        &self.tier.intervals[self.index]
    }

    /// Position of the interval within its tier
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&self) -> f64 {
        self.interval().start
    }

    pub fn end(&self) -> f64 {
        self.interval().end
    }

    pub fn label(&self) -> &'a str {
        &self.interval().label
    }

    /// Label of the previous interval, `None` for the first interval
    pub fn preceding(&self) -> Option<&'a str> {
        let prev = self.index.checked_sub(1)?;
        self.tier.intervals.get(prev).map(|i| i.label.as_str())
    }

    /// Label of the next interval, `None` for the last interval
    pub fn following(&self) -> Option<&'a str> {
        self.tier
            .intervals
            .get(self.index + 1)
            .map(|i| i.label.as_str())
    }
}

/// Every interval in `tier` labelled exactly `phone`, in tier order
///
/// Matching is plain string equality: no trimming, no case folding.
pub fn occurrences<'a>(tier: &'a Tier, phone: &'a str) -> impl Iterator<Item = Occurrence<'a>> {
    tier.intervals
        .iter()
        .enumerate()
        .filter(move |(_, interval)| interval.label == phone)
        .map(move |(index, _)| Occurrence { tier, index })
}
