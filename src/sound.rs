//! Decoded audio for formant analysis
//!
//! A [`Sound`] holds mono samples in [-1, 1] with a sample rate. Recordings
//! are decoded with symphonia; plain WAV files fall back to hound when
//! symphonia cannot probe them. Multi-channel recordings are mixed down by
//! averaging channels, since formants are measured on a single signal.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::{ExtractError, Result};

/// Mono audio samples with associated sample rate and timing information
#[derive(Debug, Clone)]
pub struct Sound {
    /// Mono samples, normalized to [-1, 1]
    samples: Vec<f64>,
    /// Sample rate in Hz
    sample_rate: f64,
    /// Time of the left edge of the first sample (usually 0.0)
    start_time: f64,
}

impl Sound {
    /// Create a Sound from raw samples
    ///
    /// # Example
    /// ```
    /// use formant_extract::Sound;
    ///
    /// let sound = Sound::from_samples(&[0.0, 0.5, 1.0, 0.5], 16000.0);
    /// assert_eq!(sound.sample_rate(), 16000.0);
    /// assert_eq!(sound.num_samples(), 4);
    /// ```
    pub fn from_samples(samples: &[f64], sample_rate: f64) -> Self {
        Self::from_samples_owned(samples.to_vec(), sample_rate)
    }

    /// Create a Sound from owned samples (avoids cloning)
    pub fn from_samples_owned(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Load a recording, mixing all channels down to mono
    ///
    /// Tries symphonia first (WAV, FLAC, OGG, ...). If that fails and the
    /// file has a `.wav` extension, hound is tried before giving up.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or decoded.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        match Self::decode_symphonia(path) {
            Ok(sound) => Ok(sound),
            Err(err) if has_wav_extension(path) => {
                debug!(path = %path.display(), error = %err, "symphonia failed, retrying with hound");
                Self::decode_wav(path)
            }
            Err(err) => Err(err),
        }
    }

    fn decode_symphonia(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ExtractError::Audio(format!("failed to probe audio format: {e}")))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| ExtractError::Audio("no audio track found".to_string()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| ExtractError::Audio("unknown sample rate".to_string()))?
            as f64;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ExtractError::Audio(format!("failed to create decoder: {e}")))?;

        let mut interleaved: Vec<f32> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(ExtractError::Audio(format!("error reading packet: {e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Corrupt packets are skipped rather than failing the file
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(ExtractError::Audio(format!("decode error: {e}"))),
            };

            let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }

        Ok(Self::from_samples_owned(
            mix_to_mono(&interleaved, channels, 1.0),
            sample_rate,
        ))
    }

    fn decode_wav(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let samples = match spec.sample_format {
            hound::SampleFormat::Int => {
                let full_scale = (1_i64 << (spec.bits_per_sample - 1)) as f64;
                let ints = reader
                    .into_samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                mix_to_mono(&ints, channels, full_scale)
            }
            hound::SampleFormat::Float => {
                let floats = reader
                    .into_samples::<f32>()
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                mix_to_mono(&floats, channels, 1.0)
            }
        };

        Ok(Self::from_samples_owned(samples, spec.sample_rate as f64))
    }

    /// Get the sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get a reference to the audio samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Get the number of samples
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Get the total duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Get the start time (left edge of the first sample)
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Get the end time (right edge of the last sample)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// Sample period, `1 / sample_rate`
    pub fn dx(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// Create a pure tone (sine wave)
    ///
    /// # Arguments
    /// * `frequency` - Frequency in Hz
    /// * `duration` - Duration in seconds
    /// * `sample_rate` - Sample rate in Hz
    /// * `amplitude` - Peak amplitude (0.0 to 1.0)
    /// * `phase` - Initial phase in radians
    pub fn create_tone(
        frequency: f64,
        duration: f64,
        sample_rate: f64,
        amplitude: f64,
        phase: f64,
    ) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate;
        let samples = (0..n_samples)
            .map(|i| amplitude * (omega * i as f64 + phase).sin())
            .collect();
        Self::from_samples_owned(samples, sample_rate)
    }

    /// First-order pre-emphasis, `y[n] = x[n] - alpha * x[n-1]`
    ///
    /// `alpha = exp(-2 * pi * from_frequency / sample_rate)`. Flattens the
    /// spectral tilt of voiced speech before LPC.
    pub fn pre_emphasis(&self, from_frequency: f64) -> Sound {
        if self.samples.is_empty() {
            return self.clone();
        }

        let alpha = (-2.0 * std::f64::consts::PI * from_frequency / self.sample_rate).exp();
        let mut filtered = Vec::with_capacity(self.samples.len());
        filtered.push(self.samples[0]);
        filtered.extend(self.samples.windows(2).map(|w| w[1] - alpha * w[0]));

        Sound {
            samples: filtered,
            sample_rate: self.sample_rate,
            start_time: self.start_time,
        }
    }

    /// Resample to a new rate with windowed sinc interpolation
    ///
    /// Downsampling first removes everything above the new Nyquist
    /// frequency with an FFT brick-wall filter. Formant analysis resamples
    /// to twice the formant ceiling before LPC.
    pub fn resample(&self, new_sample_rate: f64) -> Sound {
        if self.samples.is_empty() {
            return self.clone();
        }

        let upfactor = new_sample_rate / self.sample_rate;
        if (upfactor - 1.0).abs() < 1e-6 {
            return self.clone();
        }

        let xmin = self.start_time;
        let xmax = self.end_time();
        let new_num_samples = ((xmax - xmin) * new_sample_rate).round() as usize;
        if new_num_samples == 0 {
            return Sound {
                samples: Vec::new(),
                sample_rate: new_sample_rate,
                start_time: self.start_time,
            };
        }

        let source = if upfactor < 1.0 {
            self.lowpass_for_downsampling(upfactor)
        } else {
            self.samples.clone()
        };

        // Sample centres: the new grid is centred inside [xmin, xmax]
        let dx_old = self.dx();
        let dx_new = 1.0 / new_sample_rate;
        let x1_old = xmin + 0.5 * dx_old;
        let x1_new = 0.5 * (xmin + xmax - (new_num_samples - 1) as f64 * dx_new);

        let samples = (0..new_num_samples)
            .map(|i| {
                let x = x1_new + i as f64 * dx_new;
                sinc_interpolate(&source, (x - x1_old) / dx_old, SINC_DEPTH)
            })
            .collect();

        Sound {
            samples,
            sample_rate: new_sample_rate,
            start_time: self.start_time,
        }
    }

    /// Zero all spectral content above `upfactor * nyquist`
    ///
    /// The signal is padded with 1000 zeros on each side so the circular
    /// FFT does not wrap the tail into the head.
    fn lowpass_for_downsampling(&self, upfactor: f64) -> Vec<f64> {
        use crate::utils::Fft;
        use num_complex::Complex;

        const PAD: usize = 1000;

        let n = self.samples.len();
        let nfft = (n + 2 * PAD).next_power_of_two();
        let half = nfft / 2;

        let mut padded = vec![0.0; nfft];
        padded[PAD..PAD + n].copy_from_slice(&self.samples);

        let mut fft = Fft::new();
        let mut spectrum = fft.real_fft(&padded, nfft);
        let zero = Complex::new(0.0, 0.0);

        spectrum[half] = zero;

        // Cut-off position counted in interleaved (re, im) slots, DC first
        let cut = (upfactor * nfft as f64).floor() as usize;
        if cut <= 1 {
            spectrum.iter_mut().for_each(|c| *c = zero);
        } else {
            let first_bin = if cut % 2 == 0 {
                // Cut lands on an imaginary slot: keep only that bin's real part
                let partial = cut / 2 - 1;
                if partial > 0 && partial < half {
                    spectrum[partial].im = 0.0;
                    spectrum[nfft - partial].im = 0.0;
                }
                cut / 2
            } else {
                (cut - 1) / 2
            };
            for bin in first_bin.max(1)..half {
                spectrum[bin] = zero;
                spectrum[nfft - bin] = zero;
            }
        }

        let filtered = fft.inverse_fft(&spectrum);
        filtered[PAD..PAD + n].iter().map(|c| c.re).collect()
    }
}

/// Number of sinc lobes on each side of the interpolation point
const SINC_DEPTH: usize = 50;

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Average interleaved frames into mono, dividing by `full_scale`
fn mix_to_mono<T: Copy + Into<f64>>(interleaved: &[T], channels: usize, full_scale: f64) -> Vec<f64> {
    let channels = channels.max(1);
    interleaved
        .chunks(channels)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| s.into()).sum();
            sum / (channels as f64 * full_scale)
        })
        .collect()
}

/// Windowed sinc interpolation at fractional 0-based sample position `x`
///
/// Positions outside the signal extrapolate the edge sample. The raised
/// cosine window spans `depth` samples on each side, shrinking near the
/// edges; at depth 1 this degenerates to linear interpolation.
fn sinc_interpolate(samples: &[f64], x: f64, depth: usize) -> f64 {
    use std::f64::consts::PI;

    let n = samples.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return samples[0];
    }
    if x >= (n - 1) as f64 {
        return samples[n - 1];
    }

    let left = x.floor() as usize;
    let right = left + 1;
    let frac = x - left as f64;
    if frac == 0.0 {
        return samples[left];
    }

    let depth = depth.min(right).min(n - left - 1);
    if depth <= 1 {
        return samples[left] + frac * (samples[right] - samples[left]);
    }

    let window_half_width = depth as f64 + 0.5;
    let weight = |distance: f64| {
        let phase = PI * distance;
        let window = 1.0 + (phase / window_half_width).cos();
        0.5 * phase.sin() / phase * window
    };

    let lo = right - depth;
    let hi = left + depth;
    (lo..=hi)
        .map(|i| samples[i] * weight(x - i as f64))
        .sum()
}
