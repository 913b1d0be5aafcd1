// src/root_finding.rs - Bracketed root finding with Brent's method

use serde::{Deserialize, Serialize};

use crate::errors::{LaiPathError, Result};

/// Stopping rules for the bracket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootSettings {
    /// Absolute bracket width at which the root counts as found
    pub abs_tolerance: f64,
    /// Width tolerance relative to the smaller bracket end
    pub rel_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RootSettings {
    fn default() -> Self {
        Self {
            abs_tolerance: 1e-4,
            rel_tolerance: 0.0,
            max_iterations: 100,
        }
    }
}

/// Root estimate with the final bracket around it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RootEstimate {
    pub root: f64,
    pub lower: f64,
    pub upper: f64,
    pub iterations: usize,
}

/// How a root search ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RootOutcome {
    /// Bracket narrowed below tolerance
    Converged(RootEstimate),
    /// Iteration cap reached; the estimate is the best available
    IterationLimit(RootEstimate),
    /// The end points do not straddle zero
    Unbracketed { f_lower: f64, f_upper: f64 },
}

impl RootOutcome {
    pub fn root(&self) -> Option<f64> {
        match self {
            RootOutcome::Converged(r) | RootOutcome::IterationLimit(r) => Some(r.root),
            RootOutcome::Unbracketed { .. } => None,
        }
    }
}

struct BrentState {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    fa: f64,
    fb: f64,
    fc: f64,
}

impl BrentState {
    fn new(x_lo: f64, f_lo: f64, x_hi: f64, f_hi: f64) -> Self {
        Self {
            a: x_lo,
            b: x_hi,
            c: x_hi,
            d: x_hi - x_lo,
            e: x_hi - x_lo,
            fa: f_lo,
            fb: f_hi,
            fc: f_hi,
        }
    }

    /// One Brent step. Returns the current bracket `(lower, upper)`.
    fn iterate<F: FnMut(f64) -> f64>(&mut self, f: &mut F) -> (f64, f64) {
        let mut ac_equal = false;

        if same_sign(self.fb, self.fc) {
            ac_equal = true;
            self.c = self.a;
            self.fc = self.fa;
            self.d = self.b - self.a;
            self.e = self.b - self.a;
        }

        if self.fc.abs() < self.fb.abs() {
            ac_equal = true;
            self.a = self.b;
            self.b = self.c;
            self.c = self.a;
            self.fa = self.fb;
            self.fb = self.fc;
            self.fc = self.fa;
        }

        let tol = 0.5 * f64::EPSILON * self.b.abs();
        let m = 0.5 * (self.c - self.b);

        if self.fb == 0.0 {
            return (self.b, self.b);
        }
        if m.abs() <= tol {
            return ordered(self.b, self.c);
        }

        if self.e.abs() < tol || self.fa.abs() <= self.fb.abs() {
            self.d = m;
            self.e = m;
        } else {
            let s = self.fb / self.fa;
            let (mut p, mut q) = if ac_equal {
                (2.0 * m * s, 1.0 - s)
            } else {
                let qa = self.fa / self.fc;
                let r = self.fb / self.fc;
                (
                    s * (2.0 * m * qa * (qa - r) - (self.b - self.a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };

            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }

            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((self.e * q).abs()) {
                self.e = self.d;
                self.d = p / q;
            } else {
                self.d = m;
                self.e = m;
            }
        }

        self.a = self.b;
        self.fa = self.fb;

        if self.d.abs() > tol {
            self.b += self.d;
        } else {
            self.b += if m > 0.0 { tol } else { -tol };
        }
        self.fb = f(self.b);

        // The far end of the bracket is the previous iterate when the sign flipped
        let far = if same_sign(self.fb, self.fc) { self.a } else { self.c };
        ordered(self.b, far)
    }
}

fn same_sign(x: f64, y: f64) -> bool {
    (x < 0.0 && y < 0.0) || (x > 0.0 && y > 0.0)
}

fn ordered(x: f64, y: f64) -> (f64, f64) {
    if x < y {
        (x, y)
    } else {
        (y, x)
    }
}

fn interval_converged(lower: f64, upper: f64, settings: &RootSettings) -> bool {
    let min_abs = if same_sign(lower, upper) {
        lower.abs().min(upper.abs())
    } else {
        0.0
    };
    let tolerance = settings.abs_tolerance + settings.rel_tolerance * min_abs;
    (upper - lower).abs() <= tolerance
}

/// Find a zero of `f` inside `[x_lo, x_hi]`.
///
/// An invalid bracket is an error; a bracket whose ends share a sign is
/// reported as [`RootOutcome::Unbracketed`] so callers can decide the policy.
pub fn brent<F: FnMut(f64) -> f64>(
    mut f: F,
    x_lo: f64,
    x_hi: f64,
    settings: &RootSettings,
) -> Result<RootOutcome> {
    if !(x_lo.is_finite() && x_hi.is_finite()) || x_lo > x_hi {
        return Err(LaiPathError::invalid(format!(
            "invalid root bracket [{}, {}]",
            x_lo, x_hi
        )));
    }

    let f_lo = f(x_lo);
    let f_hi = f(x_hi);

    if f_lo == 0.0 || f_hi == 0.0 {
        let root = if f_lo == 0.0 { x_lo } else { x_hi };
        return Ok(RootOutcome::Converged(RootEstimate {
            root,
            lower: root,
            upper: root,
            iterations: 0,
        }));
    }
    if !(f_lo.is_finite() && f_hi.is_finite()) || same_sign(f_lo, f_hi) {
        return Ok(RootOutcome::Unbracketed {
            f_lower: f_lo,
            f_upper: f_hi,
        });
    }

    let mut state = BrentState::new(x_lo, f_lo, x_hi, f_hi);
    let (mut lower, mut upper) = (x_lo, x_hi);

    for iteration in 1..=settings.max_iterations {
        (lower, upper) = state.iterate(&mut f);
        log::trace!("brent iteration {}: root {:.6} in [{:.6}, {:.6}]", iteration, state.b, lower, upper);

        if interval_converged(lower, upper, settings) {
            return Ok(RootOutcome::Converged(RootEstimate {
                root: state.b,
                lower,
                upper,
                iterations: iteration,
            }));
        }
    }

    Ok(RootOutcome::IterationLimit(RootEstimate {
        root: state.b,
        lower,
        upper,
        iterations: settings.max_iterations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn finds_square_root_of_two() {
        let outcome = brent(|x| x * x - 2.0, 0.0, 2.0, &RootSettings::default()).unwrap();
        match outcome {
            RootOutcome::Converged(est) => {
                assert_approx_eq!(est.root, 2f64.sqrt(), 1e-4);
                assert!(est.upper - est.lower <= 1e-4);
                assert!(est.iterations < 20);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn decreasing_function_stays_in_bracket() {
        let f = |x: f64| (1.0 - (-x).exp()) / x - 0.5;
        let outcome = brent(f, 0.693, 6.93, &RootSettings::default()).unwrap();
        let root = outcome.root().unwrap();
        assert!((0.693..=6.93).contains(&root));
        assert_approx_eq!(root, 1.5936242600400397, 1e-4);
    }

    #[test]
    fn same_sign_is_unbracketed() {
        let outcome = brent(|x| x * x + 1.0, -1.0, 1.0, &RootSettings::default()).unwrap();
        assert!(matches!(outcome, RootOutcome::Unbracketed { .. }));
        assert_eq!(outcome.root(), None);
    }

    #[test]
    fn iteration_cap_keeps_best_estimate() {
        let settings = RootSettings {
            abs_tolerance: 0.0,
            rel_tolerance: 0.0,
            max_iterations: 2,
        };
        let outcome = brent(|x| x.powi(3) - 0.3, 0.0, 1.0, &settings).unwrap();
        match outcome {
            RootOutcome::IterationLimit(est) => {
                assert_eq!(est.iterations, 2);
                assert!(est.lower <= est.root && est.root <= est.upper);
                assert!((0.0..=1.0).contains(&est.root));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn zero_at_end_point() {
        let outcome = brent(|x| x - 1.0, 1.0, 3.0, &RootSettings::default()).unwrap();
        assert_eq!(outcome.root(), Some(1.0));
    }

    #[test]
    fn reversed_bracket_is_an_error() {
        assert!(brent(|x| x, 1.0, -1.0, &RootSettings::default()).is_err());
        assert!(brent(|x| x, f64::NAN, 1.0, &RootSettings::default()).is_err());
    }
}
