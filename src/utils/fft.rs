//! rustfft wrapper used by the resampler's anti-aliasing filter

use num_complex::Complex;
use rustfft::FftPlanner;

/// FFT processor; the planner caches plans between calls of the same size
pub struct Fft {
    planner: FftPlanner<f64>,
}

impl Fft {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Forward FFT of a real signal, zero-padded to `size`
    ///
    /// Returns the full complex spectrum (length `max(size, input.len())`),
    /// conjugate-symmetric around `size / 2`.
    pub fn real_fft(&mut self, input: &[f64], size: usize) -> Vec<Complex<f64>> {
        let size = size.max(input.len());
        let plan = self.planner.plan_fft_forward(size);

        let mut buffer: Vec<Complex<f64>> = input
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(size, Complex::new(0.0, 0.0));

        plan.process(&mut buffer);
        buffer
    }

    /// Inverse FFT, scaled by `1 / N` so that it undoes [`Fft::real_fft`]
    pub fn inverse_fft(&mut self, spectrum: &[Complex<f64>]) -> Vec<Complex<f64>> {
        let size = spectrum.len();
        let plan = self.planner.plan_fft_inverse(size);

        let mut buffer = spectrum.to_vec();
        plan.process(&mut buffer);

        let scale = 1.0 / size as f64;
        buffer.iter_mut().for_each(|c| *c *= scale);
        buffer
    }
}

impl Default for Fft {
    fn default() -> Self {
        Self::new()
    }
}
