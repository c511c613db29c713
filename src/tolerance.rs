//! Cross-backend comparison tolerances
//!
//! The 32-bit zones agree with each other lane for lane except where a
//! horizontal `sum` reduces in a different order; against the 64-bit zone they
//! differ by f32 rounding. Transcendental lanes (`exp`/`log`) get a looser
//! bound because they pass through the scalar library function.
//!
//! # Example
//!
//! ```
//! use boostkern::tolerance::BackendTolerance;
//! use boostkern::Backend;
//!
//! let tolerance = BackendTolerance::default();
//! let tol = tolerance.for_backends(Backend::Cpu64, Backend::Sse2, false);
//! assert!(BackendTolerance::approx_eq(1.0, 1.0 + 1e-7, tol));
//! ```

use crate::Backend;

/// Backend-specific tolerance configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendTolerance {
    /// Arithmetic lanes and reductions (combined absolute/relative)
    pub arithmetic: f64,
    /// Lanes computed through `exp`/`log` (combined absolute/relative)
    pub transcendental: f64,
}

impl Default for BackendTolerance {
    fn default() -> Self {
        Self {
            arithmetic: 1e-6,
            transcendental: 1e-5,
        }
    }
}

impl BackendTolerance {
    /// Exact comparisons
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            arithmetic: 0.0,
            transcendental: 0.0,
        }
    }

    /// Relaxed tolerance for long accumulations
    #[must_use]
    pub const fn relaxed() -> Self {
        Self {
            arithmetic: 1e-5,
            transcendental: 1e-4,
        }
    }

    /// Tolerance for comparing results of two backends
    #[must_use]
    pub fn for_backends(&self, a: Backend, b: Backend, transcendental: bool) -> f64 {
        if a == b {
            0.0
        } else if transcendental {
            self.transcendental
        } else {
            self.arithmetic
        }
    }

    /// `|a - b| <= tol * max(1, |a|, |b|)`; equal infinities and NaN pairs match
    #[must_use]
    pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a == b || (a.is_nan() && b.is_nan()) {
            return true;
        }
        (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
    }

    /// [`Self::approx_eq`] over two slices of equal length
    #[must_use]
    pub fn all_close(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| Self::approx_eq(x, y, tol))
    }
}
