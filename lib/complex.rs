//! Scalar complex arithmetic.
//!
//! Amplitudes are [`num_complex::Complex64`], re-exported here as [`C64`],
//! which already provides the usual field operations along with conjugation
//! (`conj`), the squared magnitude (`norm_sqr`), the magnitude (`norm`), real
//! scaling (`scale`), and polar construction (`from_polar`, `cis`). This module
//! adds the few pieces the rest of the crate needs on top of that: a compact
//! display format, approximate comparison, and conversion to and from the
//! interleaved `[re, im, re, im, ...]` buffer layout.

use std::fmt;
use crate::error::{ DimensionError, Result };

pub use num_complex::Complex64 as C64;

/// Complex zero.
pub const ZERO: C64 = C64 { re: 0.0, im: 0.0 };

/// Complex one.
pub const ONE: C64 = C64 { re: 1.0, im: 0.0 };

/// The imaginary unit.
pub const I: C64 = C64 { re: 0.0, im: 1.0 };

/// Construct `r e^{iθ} = r cos θ + i r sin θ`.
pub fn polar(r: f64, theta: f64) -> C64 { C64::from_polar(r, theta) }

/// Return `true` if `a` and `b` differ by at most `tol` in both components.
pub fn approx_eq(a: C64, b: C64, tol: f64) -> bool {
    (a.re - b.re).abs() <= tol && (a.im - b.im).abs() <= tol
}

/// Flatten amplitudes into an interleaved buffer of length `2 * amps.len()`.
pub fn to_interleaved(amps: &[C64]) -> Vec<f64> {
    amps.iter().flat_map(|a| [a.re, a.im]).collect()
}

/// Inverse of [`to_interleaved`].
///
/// Fails if `buf` has odd length.
pub fn from_interleaved(buf: &[f64]) -> Result<Vec<C64>> {
    if buf.len() % 2 != 0 {
        return Err(DimensionError::BufferLength {
            expected: buf.len() + 1,
            got: buf.len(),
        }.into());
    }
    Ok(buf.chunks_exact(2).map(|c| C64::new(c[0], c[1])).collect())
}

/// Display wrapper for a single amplitude.
///
/// A zero component is omitted (so that pure reals and pure imaginaries print
/// as a single number) and the sign of the imaginary part is written as an
/// operator when both components are present:
/// ```
/// use statevec_sim::complex::{ Amplitude, C64 };
///
/// assert_eq!(Amplitude(C64::new(0.5, 0.0)).to_string(), "0.5000");
/// assert_eq!(Amplitude(C64::new(0.0, -0.5)).to_string(), "-0.5000i");
/// assert_eq!(Amplitude(C64::new(0.5, -0.25)).to_string(), "0.5000 - 0.2500i");
/// assert_eq!(format!("{:.1}", Amplitude(C64::new(0.0, 0.0))), "0");
/// ```
/// Components with magnitude below half of the last printed decimal are
/// treated as zero. Precision defaults to 4 decimals.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Amplitude(pub C64);

impl fmt::Display for Amplitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        let eps = 0.5 * 10.0_f64.powi(-(prec as i32));
        let C64 { re, im } = self.0;
        match (re.abs() < eps, im.abs() < eps) {
            (true, true) => write!(f, "0"),
            (false, true) => write!(f, "{:.*}", prec, re),
            (true, false) => write!(f, "{:.*}i", prec, im),
            (false, false) => {
                let sign = if im < 0.0 { '-' } else { '+' };
                write!(f, "{:.*} {} {:.*}i", prec, re, sign, prec, im.abs())
            },
        }
    }
}
