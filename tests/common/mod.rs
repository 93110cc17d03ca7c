//! Fixture writers shared by the integration tests

#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::Path;

use textgrid::{Interval, TextGrid, Tier, TierType};

const SAMPLE_RATE: u32 = 16000;

/// Glottal-ish pulse train through two resonators, written as 16-bit PCM
pub fn write_vowel(path: &Path, duration: f64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let fs = SAMPLE_RATE as f64;
    let n = (duration * fs) as usize;
    let period = (fs / 120.0) as usize;

    let mut source: Vec<f64> = (0..n).map(|i| if i % period == 0 { 1.0 } else { 0.0 }).collect();
    for (freq, bw) in [(700.0, 80.0), (1200.0, 90.0)] {
        let r = (-PI * bw / fs).exp();
        let a1 = 2.0 * r * (2.0 * PI * freq / fs).cos();
        let a2 = -r * r;
        let mut y1 = 0.0;
        let mut y2 = 0.0;
        for x in source.iter_mut() {
            let y = *x + a1 * y1 + a2 * y2;
            y2 = y1;
            y1 = y;
            *x = y;
        }
    }
    let peak = source.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-9);

    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for v in source {
        writer
            .write_sample((v / peak * 0.8 * i16::MAX as f64) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

pub fn interval_tier(name: &str, xmax: f64, intervals: &[(f64, f64, &str)]) -> Tier {
    Tier {
        name: name.to_string(),
        tier_type: TierType::IntervalTier,
        xmin: 0.0,
        xmax,
        intervals: intervals
            .iter()
            .map(|&(xmin, xmax, text)| Interval {
                xmin,
                xmax,
                text: text.to_string(),
            })
            .collect(),
        points: Vec::new(),
    }
}

pub fn write_grid(path: &Path, xmax: f64, tiers: Vec<Tier>) {
    let mut grid = TextGrid::new(0.0, xmax).unwrap();
    for tier in tiers {
        grid.add_tier(tier).unwrap();
    }
    grid.to_file(path, false).unwrap();
}

/// `spk1.wav` (1.4 s) and `spk1.TextGrid` with one "ae" between silences
pub fn write_spk1(audio_dir: &Path, grid_dir: &Path) {
    write_vowel(&audio_dir.join("spk1.wav"), 1.4);
    write_grid(
        &grid_dir.join("spk1.TextGrid"),
        1.4,
        vec![
            interval_tier("spk1 - words", 1.4, &[(0.0, 1.4, "cat")]),
            interval_tier(
                "spk1 - phones",
                1.4,
                &[(0.0, 0.5, "sil"), (0.5, 1.0, "ae"), (1.0, 1.4, "sil")],
            ),
        ],
    );
}
