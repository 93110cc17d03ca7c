//! Formant analysis using Linear Predictive Coding (LPC)
//!
//! [`FormantTrack::from_sound`] computes formant frequencies frame by frame
//! with Burg's method:
//! 1. Resample to twice the formant ceiling
//! 2. Pre-emphasize to flatten the spectral slope
//! 3. Cut overlapping frames with a Gaussian window
//! 4. Fit LPC coefficients and take formants from the polynomial roots
//!
//! The extraction pipeline only sees the result through the
//! [`FormantAnalyzer`] trait: "formant n at time t, or nothing".

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::utils::{lpc_burg, lpc_to_formants};
use crate::{ExtractError, Result, Sound};

/// A source of formant values at arbitrary times
///
/// `None` means the analyzer has no value there: unvoiced or silent
/// stretches, or a time outside the analysed signal.
pub trait FormantAnalyzer {
    fn formant_at(&self, formant: FormantIndex, time: f64) -> Option<f64>;
}

/// A 1-based formant number in `1..=4` (F1 to F4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormantIndex(u8);

impl FormantIndex {
    pub const MAX: u8 = 4;

    /// Validate a formant number; only F1 to F4 are extracted
    pub fn new(number: u8) -> Result<Self> {
        if (1..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ExtractError::Usage(format!(
                "formant index {number} is out of range; expected 1 to {}",
                Self::MAX
            )))
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Output column name, `F1` .. `F4`
    pub fn column_name(self) -> String {
        format!("F{}", self.0)
    }
}

impl fmt::Display for FormantIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Accepts `2`, `f2` and `F2`
impl FromStr for FormantIndex {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('f')
            .or_else(|| trimmed.strip_prefix('F'))
            .unwrap_or(trimmed);
        let number: u8 = digits
            .parse()
            .map_err(|_| ExtractError::Usage(format!("invalid formant '{s}'; expected 1-4 or f1-f4")))?;
        Self::new(number)
    }
}

/// Lowest accepted formant ceiling in Hz
pub const MIN_MAX_FORMANT_HZ: f64 = 1000.0;

/// Parameters for Burg formant analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantSettings {
    /// Seconds between frame centres; 0.0 means a quarter of the window length
    pub time_step: f64,
    /// Formants tracked per frame
    pub max_num_formants: usize,
    /// Formant ceiling in Hz; the signal is resampled to twice this rate
    pub max_formant_hz: f64,
    /// Half the analysis window duration in seconds
    pub window_length: f64,
    /// Pre-emphasis corner frequency in Hz
    pub pre_emphasis_from: f64,
}

impl Default for FormantSettings {
    fn default() -> Self {
        Self {
            time_step: 0.0,
            max_num_formants: 5,
            max_formant_hz: 5000.0,
            window_length: 0.025,
            pre_emphasis_from: 50.0,
        }
    }
}

/// Formant frequencies for one analysis frame, F1 first; NaN when undefined
#[derive(Debug, Clone)]
struct FormantFrame {
    frequencies: Vec<f64>,
}

impl FormantFrame {
    fn frequency(&self, formant: usize) -> f64 {
        formant
            .checked_sub(1)
            .and_then(|i| self.frequencies.get(i))
            .copied()
            .unwrap_or(f64::NAN)
    }
}

/// Formant contours over time, one frame every `time_step` seconds
#[derive(Debug, Clone)]
pub struct FormantTrack {
    frames: Vec<FormantFrame>,
    /// Centre time of the first frame
    start_time: f64,
    time_step: f64,
    max_num_formants: usize,
}

impl FormantTrack {
    /// Run Burg formant analysis over the whole sound
    pub fn from_sound(sound: &Sound, settings: &FormantSettings) -> Self {
        let max_num_formants = settings.max_num_formants.clamp(1, 10);
        let window_length = settings.window_length.clamp(0.01, 0.1);
        let max_formant_hz = settings
            .max_formant_hz
            .max(MIN_MAX_FORMANT_HZ)
            .min(sound.sample_rate() / 2.0);
        let time_step = if settings.time_step > 0.0 {
            settings.time_step
        } else {
            window_length / 4.0
        };

        let target_rate = 2.0 * max_formant_hz;
        let resampled = if sound.sample_rate() > target_rate {
            sound.resample(target_rate)
        } else {
            sound.clone()
        };
        // The filter coefficient depends on the rate, so emphasize after resampling
        let emphasized = if settings.pre_emphasis_from > 0.0 {
            resampled.pre_emphasis(settings.pre_emphasis_from)
        } else {
            resampled
        };

        let sample_rate = emphasized.sample_rate();
        let samples = emphasized.samples();
        let dx = emphasized.dx();
        let x1 = emphasized.start_time() + 0.5 * dx;

        // `window_length` is the half window; the frame spans twice that
        let frame_duration = 2.0 * window_length;
        let frame_len = (frame_duration / dx).floor() as usize;
        let half_frame = frame_len / 2;
        let window = gaussian_window(frame_len);

        let physical_duration = samples.len() as f64 * dx;
        let num_frames = if physical_duration < frame_duration || samples.is_empty() {
            0
        } else {
            1 + ((physical_duration - frame_duration) / time_step).floor() as usize
        };

        if num_frames == 0 {
            debug!(duration = sound.duration(), "sound too short for a single formant frame");
            return Self {
                frames: Vec::new(),
                start_time: sound.start_time(),
                time_step,
                max_num_formants,
            };
        }

        // Frames are centred within the signal
        let first_frame_time =
            x1 + 0.5 * (physical_duration - dx - (num_frames - 1) as f64 * time_step);
        let lpc_order = 2 * max_num_formants;

        let frames = (0..num_frames)
            .map(|frame_idx| {
                let t = first_frame_time + frame_idx as f64 * time_step;
                let left = ((t - x1) / dx).floor() as isize;
                let first = (left + 1 - half_frame as isize).max(0) as usize;
                let last = ((left + half_frame as isize).max(0) as usize)
                    .min(samples.len().saturating_sub(1));

                let mut frame: Vec<f64> = if last >= first {
                    samples[first..=last]
                        .iter()
                        .zip(window.iter().chain(std::iter::repeat(&0.0)))
                        .map(|(s, w)| s * w)
                        .collect()
                } else {
                    Vec::new()
                };
                add_dither(&mut frame, frame_idx);

                let lpc = lpc_burg(&frame, lpc_order);
                let mut frequencies: Vec<f64> = lpc_to_formants(&lpc.coefficients, sample_rate)
                    .into_iter()
                    .filter(|c| {
                        c.frequency > 50.0
                            && c.frequency < max_formant_hz
                            && c.bandwidth > 0.0
                            && c.bandwidth < max_formant_hz
                            && c.bandwidth < 2.0 * c.frequency
                    })
                    .take(max_num_formants)
                    .map(|c| c.frequency)
                    .collect();
                frequencies.resize(max_num_formants, f64::NAN);

                FormantFrame { frequencies }
            })
            .collect::<Vec<_>>();

        debug!(
            frames = frames.len(),
            time_step,
            max_formant_hz,
            "formant analysis complete"
        );

        Self {
            frames,
            start_time: first_frame_time,
            time_step,
            max_num_formants,
        }
    }

    /// Formant frequency in Hz at `time`, linearly interpolated between frames
    ///
    /// Undefined neighbours are skipped: if one of the two surrounding frames
    /// is undefined the other is returned, if both are, `None`. Times more than
    /// half a frame outside the track are `None` as well.
    pub fn value_at_time(&self, formant: usize, time: f64) -> Option<f64> {
        if formant == 0 || formant > self.max_num_formants || self.frames.is_empty() {
            return None;
        }

        let position = (time - self.start_time) / self.time_step;
        if position < -0.5 || position > self.frames.len() as f64 - 0.5 {
            return None;
        }
        let position = position.max(0.0);

        let idx = (position.floor() as usize).min(self.frames.len() - 1);
        let frac = position - idx as f64;
        let v0 = self.frames[idx].frequency(formant);
        let v1 = self
            .frames
            .get(idx + 1)
            .map(|f| f.frequency(formant))
            .unwrap_or(v0);

        match (v0.is_nan(), v1.is_nan()) {
            (true, true) => None,
            (true, false) => Some(v1),
            (false, true) => Some(v0),
            (false, false) => Some(v0 + frac * (v1 - v0)),
        }
    }

    /// Formant frequency at a frame, `None` if undefined
    #[cfg(test)]
    fn value_at_frame(&self, formant: usize, frame: usize) -> Option<f64> {
        self.frames
            .get(frame)
            .map(|f| f.frequency(formant))
            .filter(|v| !v.is_nan())
    }

    /// Centre time of a frame
    #[cfg(test)]
    fn frame_time(&self, frame: usize) -> f64 {
        self.start_time + frame as f64 * self.time_step
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn max_num_formants(&self) -> usize {
        self.max_num_formants
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }
}

impl FormantAnalyzer for FormantTrack {
    fn formant_at(&self, formant: FormantIndex, time: f64) -> Option<f64> {
        self.value_at_time(formant.get(), time)
    }
}

impl Sound {
    /// Compute formant tracks from this sound using Burg's LPC method
    pub fn to_formant_burg(&self, settings: &FormantSettings) -> FormantTrack {
        FormantTrack::from_sound(self, settings)
    }
}

/// Gaussian analysis window with its edges pulled down to zero
///
/// `w[i] = (exp(-48 (i - mid)^2 / (n + 1)^2) - e^-12) / (1 - e^-12)`
fn gaussian_window(size: usize) -> Vec<f64> {
    let edge = (-12.0_f64).exp();
    let mid = (size as f64 - 1.0) / 2.0;
    let denom = (size + 1) as f64;

    (0..size)
        .map(|i| {
            let d = i as f64 - mid;
            ((-48.0 * d * d / (denom * denom)).exp() - edge) / (1.0 - edge)
        })
        .collect()
}

/// Tiny deterministic dither so digital silence still yields a solvable LPC
/// system; offset per frame so silent frames do not all look identical.
fn add_dither(frame: &mut [f64], frame_idx: usize) {
    const AMPLITUDE: f64 = 1e-10;
    let offset = frame_idx as f64 * 17.3;
    for (i, s) in frame.iter_mut().enumerate() {
        let pos = i as f64 + offset;
        *s += AMPLITUDE * ((pos * 0.7).sin() + (pos * 1.3).cos());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Pulse train through two resonators, a crude vowel with F1 ~ 700 Hz, F2 ~ 1200 Hz
    fn synthetic_vowel(duration: f64, sample_rate: f64) -> Sound {
        let n = (duration * sample_rate) as usize;
        let period = (sample_rate / 120.0) as usize;
        let mut signal: Vec<f64> = (0..n).map(|i| if i % period == 0 { 1.0 } else { 0.0 }).collect();

        for (freq, bw) in [(700.0, 80.0), (1200.0, 90.0)] {
            let r = (-PI * bw / sample_rate).exp();
            let a1 = 2.0 * r * (2.0 * PI * freq / sample_rate).cos();
            let a2 = -r * r;
            let (mut y1, mut y2) = (0.0, 0.0);
            for s in signal.iter_mut() {
                let y = *s + a1 * y1 + a2 * y2;
                y2 = y1;
                y1 = y;
                *s = y;
            }
        }

        let peak = signal.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        Sound::from_samples_owned(signal.iter().map(|s| 0.5 * s / peak).collect(), sample_rate)
    }

    #[test]
    fn test_formant_index_range() {
        assert!(FormantIndex::new(0).is_err());
        assert_eq!(FormantIndex::new(1).unwrap().get(), 1);
        assert_eq!(FormantIndex::new(4).unwrap().get(), 4);
        assert!(matches!(FormantIndex::new(5), Err(ExtractError::Usage(_))));
    }

    #[test]
    fn test_formant_index_parse() {
        assert_eq!("2".parse::<FormantIndex>().unwrap().get(), 2);
        assert_eq!("f3".parse::<FormantIndex>().unwrap().get(), 3);
        assert_eq!("F1".parse::<FormantIndex>().unwrap().column_name(), "F1");
        assert!("f9".parse::<FormantIndex>().is_err());
        assert!("two".parse::<FormantIndex>().is_err());
    }

    #[test]
    fn test_formant_track_has_frames() {
        let sound = Sound::create_tone(200.0, 0.5, 16000.0, 0.5, 0.0);
        let track = sound.to_formant_burg(&FormantSettings::default());

        assert!(track.num_frames() > 0);
        assert_eq!(track.max_num_formants(), 5);
        assert_relative_eq!(track.time_step(), 0.025 / 4.0, epsilon = 1e-12);
        assert!(track.frame_time(1) > track.start_time());
    }

    #[test]
    fn test_short_sound_has_no_frames() {
        let sound = Sound::create_tone(200.0, 0.02, 16000.0, 0.5, 0.0);
        let track = sound.to_formant_burg(&FormantSettings::default());

        assert_eq!(track.num_frames(), 0);
        assert_eq!(track.value_at_time(1, 0.01), None);
    }

    #[test]
    fn test_out_of_range_queries_are_missing() {
        let sound = synthetic_vowel(0.5, 16000.0);
        let track = sound.to_formant_burg(&FormantSettings::default());

        assert_eq!(track.value_at_time(0, 0.25), None);
        assert_eq!(track.value_at_time(6, 0.25), None);
        assert_eq!(track.value_at_time(1, -1.0), None);
        assert_eq!(track.value_at_time(1, 10.0), None);
    }

    #[test]
    fn test_synthetic_vowel_formants() {
        let sound = synthetic_vowel(0.5, 16000.0);
        let track = sound.to_formant_burg(&FormantSettings::default());

        // Extra LPC poles may slot in between, so look for the resonances
        // among the first four tracked formants
        let found: Vec<f64> = (1..=4)
            .filter_map(|n| track.formant_at(FormantIndex::new(n).unwrap(), 0.25))
            .collect();
        assert!(found.iter().any(|f| (f - 700.0).abs() < 100.0), "formants = {found:?}");
        assert!(found.iter().any(|f| (f - 1200.0).abs() < 100.0), "formants = {found:?}");
    }

    #[test]
    fn test_value_at_frame_matches_time_query() {
        let sound = synthetic_vowel(0.3, 16000.0);
        let track = sound.to_formant_burg(&FormantSettings::default());

        let frame = track.num_frames() / 2;
        let by_frame = track.value_at_frame(1, frame).unwrap();
        let by_time = track.value_at_time(1, track.frame_time(frame)).unwrap();
        assert_relative_eq!(by_frame, by_time, epsilon = 1e-6);
    }

    #[test]
    fn test_gaussian_window_shape() {
        let window = gaussian_window(101);
        assert_relative_eq!(window[50], 1.0, epsilon = 1e-12);
        for i in 0..50 {
            assert_relative_eq!(window[i], window[100 - i], epsilon = 1e-12);
        }
        assert!(window[0] < 0.01);
        assert!(gaussian_window(0).is_empty());
    }
}
