/// Numeric kernels shared by the rate estimator and the forecaster:
/// least-squares fits and robust spread statistics.

const SINGULAR_EPS: f64 = 1e-12;

/// Ordinary least squares `y = slope * x + intercept`.
///
/// `None` when fewer than two points or when all x coincide.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }

    let nf = n as f64;
    let x_mean = xs.iter().sum::<f64>() / nf;
    let y_mean = ys.iter().sum::<f64>() / nf;

    let mut num = 0.0;
    let mut den = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        num += (x - x_mean) * (y - y_mean);
        den += (x - x_mean) * (x - x_mean);
    }
    if den.abs() < SINGULAR_EPS {
        return None;
    }

    let slope = num / den;
    Some((slope, y_mean - slope * x_mean))
}

fn det3(m: [[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Least-squares fit of `y = a*x^2 + b*x + c` via the normal equations,
/// solved with Cramer's rule. `None` when fewer than three points or the
/// system is singular (e.g. collinear x).
pub fn quadratic_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64, f64)> {
    let n = xs.len();
    if n < 3 || n != ys.len() {
        return None;
    }

    let (mut s1, mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0, 0.0);
    let (mut t0, mut t1, mut t2) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        let x2 = x * x;
        s1 += x;
        s2 += x2;
        s3 += x2 * x;
        s4 += x2 * x2;
        t0 += y;
        t1 += x * y;
        t2 += x2 * y;
    }
    let s0 = n as f64;

    let m = [[s4, s3, s2], [s3, s2, s1], [s2, s1, s0]];
    let det = det3(m);
    if det.abs() < SINGULAR_EPS {
        return None;
    }

    let ma = [[t2, s3, s2], [t1, s2, s1], [t0, s1, s0]];
    let mb = [[s4, t2, s2], [s3, t1, s1], [s2, t0, s0]];
    let mc = [[s4, s3, t2], [s3, s2, t1], [s2, s1, t0]];

    Some((det3(ma) / det, det3(mb) / det, det3(mc) / det))
}

/// Median of a sample; `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median absolute deviation around the sample median. Zero for a slice
/// where more than half the values coincide, so callers need a fallback
/// spread estimate.
pub fn median_abs_deviation(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_fit_recovers_exact_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [5.0, 3.0, 1.0, -1.0];
        let (slope, intercept) = linear_fit(&xs, &ys).unwrap();
        assert!((slope + 2.0).abs() < 1e-9);
        assert!((intercept - 5.0).abs() < 1e-9);
    }

    #[test]
    fn linear_fit_rejects_degenerate_input() {
        assert!(linear_fit(&[1.0], &[2.0]).is_none());
        assert!(linear_fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn quadratic_fit_recovers_exact_parabola() {
        // y = -x^2 + 2x + 8
        let xs: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| -x * x + 2.0 * x + 8.0).collect();
        let (a, b, c) = quadratic_fit(&xs, &ys).unwrap();
        assert!((a + 1.0).abs() < 1e-6);
        assert!((b - 2.0).abs() < 1e-6);
        assert!((c - 8.0).abs() < 1e-6);
    }

    #[test]
    fn quadratic_fit_rejects_singular_system() {
        assert!(quadratic_fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(quadratic_fit(&[1.0, 2.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn median_and_mad() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));

        let mad = median_abs_deviation(&[1.0, 1.0, 2.0, 2.0, 100.0]).unwrap();
        assert!((mad - 1.0).abs() < 1e-9);

        // Majority-identical values collapse MAD to zero.
        assert_eq!(median_abs_deviation(&[5.0, 5.0, 5.0, 9.0]), Some(0.0));
    }

    #[test]
    fn std_dev_basics() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[3.0, 3.0, 3.0]), 0.0);
        assert!((std_dev(&[2.0, 4.0]) - 1.0).abs() < 1e-9);
    }
}
