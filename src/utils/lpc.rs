//! Linear prediction for formant estimation
//!
//! [`lpc_burg`] fits an all-pole model to one windowed analysis frame with
//! Burg's method; [`lpc_to_formants`] turns the model's poles into formant
//! frequency/bandwidth pairs.

use nalgebra::DMatrix;
use num_complex::Complex;
use std::f64::consts::PI;

/// Frequencies closer than this to 0 Hz or to Nyquist are not formants
const EDGE_MARGIN_HZ: f64 = 50.0;

/// Newton-Raphson iterations allowed when polishing a root
const POLISH_ITERATIONS: usize = 80;

/// Result of LPC analysis on one frame
#[derive(Debug, Clone)]
pub struct LpcResult {
    /// Predictor coefficients `a[1..=m]` (no leading 1.0)
    pub coefficients: Vec<f64>,
    /// Mean squared prediction error
    pub gain: f64,
}

/// Burg's method for LPC coefficients of the given order
///
/// Works on forward and backward prediction errors directly, so it stays
/// stable on short frames where autocorrelation LPC does not. Frames of
/// zero energy return all-zero coefficients.
pub fn lpc_burg(samples: &[f64], order: usize) -> LpcResult {
    let n = samples.len();
    let mut a = vec![0.0; order];

    if n <= 2 {
        if let Some(first) = a.first_mut() {
            *first = -1.0;
        }
        let gain = match n {
            2 => 0.5 * (samples[0] * samples[0] + samples[1] * samples[1]),
            1 => samples[0] * samples[0],
            _ => 0.0,
        };
        return LpcResult { coefficients: a, gain };
    }

    let power: f64 = samples.iter().map(|s| s * s).sum();
    let mut gain = power / n as f64;
    if gain <= 0.0 {
        return LpcResult { coefficients: a, gain };
    }

    // Forward errors start at x[0..n-1], backward errors at x[1..n]
    let mut forward = samples[..n - 1].to_vec();
    let mut backward = samples[1..].to_vec();
    forward.push(0.0);
    backward.push(0.0);

    let mut previous = vec![0.0; order];

    for i in 0..order {
        let span = n - i - 1;
        let (num, den) = forward[..span]
            .iter()
            .zip(&backward[..span])
            .fold((0.0, 0.0), |(num, den), (f, b)| {
                (num + f * b, den + f * f + b * b)
            });

        if den <= 0.0 {
            return LpcResult {
                coefficients: a,
                gain: 0.0,
            };
        }

        let reflection = 2.0 * num / den;
        a[i] = reflection;
        gain *= 1.0 - reflection * reflection;

        for j in 0..i {
            a[j] = previous[j] - reflection * previous[i - j - 1];
        }

        if i + 1 < order {
            previous[..=i].copy_from_slice(&a[..=i]);
            for j in 0..n - i - 2 {
                forward[j] -= reflection * backward[j];
                backward[j] = backward[j + 1] - reflection * forward[j + 1];
            }
        }
    }

    LpcResult { coefficients: a, gain }
}

/// A formant (resonance) with frequency and bandwidth
#[derive(Debug, Clone, Copy)]
pub struct FormantCandidate {
    /// Frequency in Hz
    pub frequency: f64,
    /// Bandwidth in Hz
    pub bandwidth: f64,
}

/// Formant candidates from the poles of an LPC model, sorted by frequency
///
/// The polynomial `z^m - a[m-1] z^(m-1) - ... - a[0]` (coefficients reversed
/// and negated) is solved, roots outside the unit circle are reflected
/// inside, and each root in the upper half-plane becomes a candidate whose
/// frequency comes from its angle and bandwidth from its radius.
pub fn lpc_to_formants(coefficients: &[f64], sample_rate: f64) -> Vec<FormantCandidate> {
    let m = coefficients.len();
    if m == 0 {
        return Vec::new();
    }

    let nyquist = sample_rate / 2.0;

    // poly[k] is the coefficient of z^k
    let mut poly: Vec<f64> = coefficients.iter().rev().map(|&c| -c).collect();
    poly.push(1.0);

    let mut roots = polynomial_roots(&poly);
    polish_roots(&poly, &mut roots);

    for root in &mut roots {
        let radius = root.norm();
        if radius > 1.0 {
            // 1 / conj(z): same angle, radius inverted
            *root /= radius * radius;
        }
    }

    let mut formants: Vec<FormantCandidate> = roots
        .iter()
        .filter(|root| root.im >= 0.0)
        .filter_map(|root| {
            let frequency = root.im.atan2(root.re).abs() * nyquist / PI;
            if frequency < EDGE_MARGIN_HZ || frequency > nyquist - EDGE_MARGIN_HZ {
                return None;
            }
            // Pole radius r gives bandwidth -ln(r^2) * nyquist / pi
            let radius_sq = root.norm_sqr();
            let bandwidth = if radius_sq > 0.0 {
                -radius_sq.ln() * nyquist / PI
            } else {
                nyquist
            };
            Some(FormantCandidate {
                frequency,
                bandwidth,
            })
        })
        .collect();

    formants.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
    formants
}

/// Roots of `poly[0] + poly[1] z + ... + poly[n] z^n`
///
/// Degrees one and two are solved directly; higher degrees use the
/// eigenvalues of the companion matrix.
fn polynomial_roots(poly: &[f64]) -> Vec<Complex<f64>> {
    let degree = poly.len().saturating_sub(1);
    if degree == 0 {
        return Vec::new();
    }

    let leading = poly[degree];
    if leading.abs() < 1e-15 {
        return polynomial_roots(&poly[..degree]);
    }
    let monic: Vec<f64> = poly.iter().map(|&c| c / leading).collect();

    match degree {
        1 => vec![Complex::new(-monic[0], 0.0)],
        2 => {
            let (b, c) = (monic[1], monic[0]);
            let discriminant = b * b - 4.0 * c;
            if discriminant >= 0.0 {
                let root = discriminant.sqrt();
                vec![
                    Complex::new((-b + root) / 2.0, 0.0),
                    Complex::new((-b - root) / 2.0, 0.0),
                ]
            } else {
                let root = (-discriminant).sqrt();
                vec![
                    Complex::new(-b / 2.0, root / 2.0),
                    Complex::new(-b / 2.0, -root / 2.0),
                ]
            }
        }
        _ => {
            // Ones on the subdiagonal, negated coefficients in the last column
            let mut companion = DMatrix::<f64>::zeros(degree, degree);
            for i in 1..degree {
                companion[(i, i - 1)] = 1.0;
            }
            for i in 0..degree {
                companion[(i, degree - 1)] = -monic[i];
            }
            companion.complex_eigenvalues().iter().copied().collect()
        }
    }
}

/// Horner evaluation of the polynomial and its derivative at `z`
fn evaluate_with_derivative(poly: &[f64], z: Complex<f64>) -> (Complex<f64>, Complex<f64>) {
    let Some((&leading, rest)) = poly.split_last() else {
        return (Complex::new(0.0, 0.0), Complex::new(0.0, 0.0));
    };

    let mut p = Complex::new(leading, 0.0);
    let mut dp = Complex::new(0.0, 0.0);
    for &c in rest.iter().rev() {
        dp = dp * z + p;
        p = p * z + c;
    }
    (p, dp)
}

/// Newton-Raphson refinement, stopping as soon as the residual stops shrinking
fn polish_root(poly: &[f64], root: Complex<f64>, real: bool) -> Complex<f64> {
    let mut current = root;
    let mut best = root;
    let mut best_residual = f64::MAX;

    for _ in 0..POLISH_ITERATIONS {
        let (p, dp) = evaluate_with_derivative(poly, current);
        let residual = p.norm();

        if residual >= best_residual || (best_residual - residual).abs() < 1e-15 {
            return best;
        }
        best_residual = residual;
        best = current;

        if dp.norm() == 0.0 {
            return best;
        }
        current -= p / dp;
        if real {
            current.im = 0.0;
        }
    }
    best
}

/// Polish every root; conjugate partners are mirrored instead of re-solved
fn polish_roots(poly: &[f64], roots: &mut [Complex<f64>]) {
    let mut i = 0;
    while i < roots.len() {
        let original = roots[i];

        if original.im.abs() > 1e-15 {
            roots[i] = polish_root(poly, original, false);

            if let Some(next) = roots.get(i + 1).copied() {
                if (next.im + original.im).abs() < 1e-10 && (next.re - original.re).abs() < 1e-10 {
                    roots[i + 1] = roots[i].conj();
                    i += 1;
                }
            }
        } else {
            roots[i] = polish_root(poly, Complex::new(original.re, 0.0), true);
        }

        i += 1;
    }
}
