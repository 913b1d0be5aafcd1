// src/quadrature.rs - Adaptive 21-point Gauss-Kronrod integration

use serde::{Deserialize, Serialize};

/// Abscissae of the 21-point Kronrod rule on `[-1, 1]` (non-negative half).
/// Odd indices are the 10-point Gauss abscissae.
const XGK: [f64; 11] = [
    0.995657163025808080735527280689003,
    0.973906528517171720077964012084452,
    0.930157491355708226001207180059508,
    0.865063366688984510732096688423493,
    0.780817726586416897063717578345042,
    0.679409568299024406234327365114874,
    0.562757134668604683339000099272694,
    0.433395394129247190799265943165784,
    0.294392862701460198131126603103866,
    0.148874338981631210884826001129720,
    0.000000000000000000000000000000000,
];

/// Weights of the 10-point Gauss rule
const WG: [f64; 5] = [
    0.066671344308688137593568809893332,
    0.149451349150580593145776339657697,
    0.219086362515982043995534934228163,
    0.269266719309996355091226921569469,
    0.295524224714752870173892994651338,
];

/// Weights of the 21-point Kronrod rule
const WGK: [f64; 11] = [
    0.011694638867371874278064396062192,
    0.032558162307964727478818972459390,
    0.054755896574351996031381300244580,
    0.075039674810919952767043140916190,
    0.093125454583697605535065465083366,
    0.109387158802297641899210590325805,
    0.123491976262065851077208649315802,
    0.134709217311473325928054001771707,
    0.142775938577060080797094273138717,
    0.147739104901338491374841515972068,
    0.149445554002916905664936468389821,
];

/// Tolerances for the adaptive integrator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadratureSettings {
    pub abs_tolerance: f64,
    pub rel_tolerance: f64,
    /// Maximum number of subintervals
    pub limit: usize,
}

impl Default for QuadratureSettings {
    fn default() -> Self {
        Self {
            abs_tolerance: 1e-7,
            rel_tolerance: 0.0,
            limit: 1000,
        }
    }
}

/// Result of an adaptive integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integral {
    pub value: f64,
    pub abs_error: f64,
    pub subintervals: usize,
    /// False when the subinterval limit or roundoff stopped refinement early
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

impl Segment {
    fn new<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> Self {
        let (value, error) = gauss_kronrod_21(f, a, b);
        Self { a, b, value, error }
    }
}

/// Integrate `f` over `[a, b]`
pub fn integrate<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, settings: &QuadratureSettings) -> Integral {
    integrate_segmented(f, &[a, b], settings)
}

/// Integrate `f` over `[points[0], points[last]]`, never placing a rule
/// across one of the interior `points`.
pub fn integrate_segmented<F: Fn(f64) -> f64>(
    f: F,
    points: &[f64],
    settings: &QuadratureSettings,
) -> Integral {
    let mut segments: Vec<Segment> = points
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| Segment::new(&f, w[0], w[1]))
        .collect();

    if segments.is_empty() {
        return Integral {
            value: 0.0,
            abs_error: 0.0,
            subintervals: 0,
            converged: true,
        };
    }

    let limit = settings.limit.max(segments.len());
    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let abs_error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = settings.abs_tolerance.max(settings.rel_tolerance * value.abs());

        if abs_error <= tolerance {
            return Integral { value, abs_error, subintervals: segments.len(), converged: true };
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.error.total_cmp(&y.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let Segment { a, b, .. } = segments[worst];
        let mid = 0.5 * (a + b);

        if segments.len() >= limit || mid <= a || mid >= b {
            log::debug!(
                "Quadrature stopped at {} subintervals with error {:.3e} (tolerance {:.3e})",
                segments.len(),
                abs_error,
                tolerance
            );
            return Integral { value, abs_error, subintervals: segments.len(), converged: false };
        }

        segments[worst] = Segment::new(&f, a, mid);
        segments.push(Segment::new(&f, mid, b));
    }
}

/// Integrate `f` over `[a, b]` where `f` may blow up like `(b - x)^(-1/2)`
/// at the upper end. `f` is never evaluated at `b` itself.
pub fn integrate_upper_singular<F: Fn(f64) -> f64>(
    f: F,
    a: f64,
    b: f64,
    settings: &QuadratureSettings,
) -> Integral {
    let width = b - a;
    let mapped = |u: f64| {
        let x = b - width * u * u;
        f(x) * 2.0 * width * u
    };
    integrate(mapped, 0.0, 1.0, settings)
}

/// Apply the 21-point Kronrod rule on `[a, b]`, returning the estimate and an
/// error bound derived from the embedded Gauss rule.
fn gauss_kronrod_21<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> (f64, f64) {
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);
    let abs_half = half.abs();

    let f_center = f(center);
    let mut result_gauss = 0.0;
    let mut result_kronrod = f_center * WGK[10];
    let mut result_abs = result_kronrod.abs();
    let mut fv1 = [0.0; 10];
    let mut fv2 = [0.0; 10];

    for j in 0..10 {
        let offset = half * XGK[j];
        let f1 = f(center - offset);
        let f2 = f(center + offset);
        fv1[j] = f1;
        fv2[j] = f2;
        if j % 2 == 1 {
            result_gauss += WG[j / 2] * (f1 + f2);
        }
        result_kronrod += WGK[j] * (f1 + f2);
        result_abs += WGK[j] * (f1.abs() + f2.abs());
    }

    let mean = result_kronrod * 0.5;
    let mut result_asc = WGK[10] * (f_center - mean).abs();
    for j in 0..10 {
        result_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
    }

    let value = result_kronrod * half;
    let error = rescale_error(
        ((result_kronrod - result_gauss) * half).abs(),
        result_abs * abs_half,
        result_asc * abs_half,
    );
    (value, error)
}

fn rescale_error(mut err: f64, result_abs: f64, result_asc: f64) -> f64 {
    if result_asc != 0.0 && err != 0.0 {
        let scale = (200.0 * err / result_asc).powf(1.5);
        err = if scale < 1.0 { result_asc * scale } else { result_asc };
    }
    if result_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        let min_err = 50.0 * f64::EPSILON * result_abs;
        if min_err > err {
            err = min_err;
        }
    }
    err
}
