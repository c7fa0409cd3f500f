//! Quantile functions for the normal and Student-t distributions.

use std::f64::consts::PI;

const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const P_LOW: f64 = 0.02425;

/// Inverse CDF of the standard normal distribution (Acklam's rational
/// approximation, relative error below 1.2e-9).
pub fn normal_quantile(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Critical value `t` such that `P(|T| > t) = two_tailed_p` for `df` degrees
/// of freedom (Hill, ACM algorithm 396).
pub fn student_t_two_tailed(two_tailed_p: f64, df: u64) -> f64 {
    let p = two_tailed_p;
    if df == 0 || !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }
    if df == 1 {
        return 1.0 / (p * PI / 2.0).tan();
    }
    if df == 2 {
        return (2.0 / (p * (2.0 - p)) - 2.0).sqrt();
    }

    let n = df as f64;
    let a = 1.0 / (n - 0.5);
    let b = 48.0 / (a * a);
    let mut c = ((20700.0 * a / b - 98.0) * a - 16.0) * a + 96.36;
    let d = ((94.5 / (b + c) - 3.0) / b + 1.0) * (a * PI / 2.0).sqrt() * n;
    let mut x = d * p;
    let mut y = x.powf(2.0 / n);

    if y > 0.05 + a {
        x = normal_quantile(p * 0.5);
        y = x * x;
        if df < 5 {
            c += 0.3 * (n - 4.5) * (x + 0.6);
        }
        c = (((0.05 * d * x - 5.0) * x - 7.0) * x - 2.0) * x + b + c;
        y = (((((0.4 * y + 6.3) * y + 36.0) * y + 94.5) / c - y - 3.0) / b + 1.0) * x;
        y = a * y * y;
        y = if y > 0.002 { y.exp() - 1.0 } else { 0.5 * y * y + y };
    } else {
        y = ((1.0 / (((n + 6.0) / (n * y) - 0.089 * d - 0.822) * (n + 2.0) * 3.0)
            + 0.5 / (n + 4.0))
            * y
            - 1.0)
            * (n + 1.0)
            / (n + 2.0)
            + 1.0 / y;
    }

    (n * y).sqrt()
}

/// Upper quantile of Student's t: returns `t` with `P(T <= t) = p` for `p > 0.5`.
pub fn student_t_quantile(p: f64, df: u64) -> f64 {
    if p == 0.5 {
        return 0.0;
    }
    let t = student_t_two_tailed(2.0 * (1.0 - p).min(p), df);
    if p > 0.5 {
        t
    } else {
        -t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn normal_quantile_matches_tables() {
        assert!(close(normal_quantile(0.975), 1.959964, 1e-5));
        assert!(close(normal_quantile(0.5), 0.0, 1e-9));
        assert!(close(normal_quantile(0.995), 2.575829, 1e-5));
        assert!(close(normal_quantile(0.01), -2.326348, 1e-5));
        assert!(normal_quantile(0.0).is_infinite());
    }

    #[test]
    fn student_t_matches_tables() {
        assert!(close(student_t_quantile(0.975, 1), 12.7062, 1e-3));
        assert!(close(student_t_quantile(0.975, 2), 4.3027, 1e-3));
        assert!(close(student_t_quantile(0.975, 3), 3.182446, 1e-3));
        assert!(close(student_t_quantile(0.975, 9), 2.262157, 1e-3));
        assert!(close(student_t_quantile(0.975, 29), 2.045230, 1e-3));
        assert!(close(student_t_quantile(0.995, 10), 3.169273, 1e-3));
    }

    #[test]
    fn student_t_is_symmetric_and_approaches_normal() {
        assert!(close(student_t_quantile(0.025, 5), -student_t_quantile(0.975, 5), 1e-12));
        assert!(close(student_t_quantile(0.975, 10_000), normal_quantile(0.975), 1e-3));
    }
}
