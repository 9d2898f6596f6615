//! Linear interpolation and ordinary least squares with an intercept.

/// Linearly interpolate `(x, y)` points (sorted by `x`) at `at`.
///
/// No extrapolation: `None` outside `[x_first, x_last]`.
pub fn interpolate(points: &[(f64, f64)], at: f64) -> Option<f64> {
    let (first, last) = (points.first()?, points.last()?);
    if at < first.0 || at > last.0 {
        return None;
    }
    let i = points.partition_point(|p| p.0 <= at);
    if i == 0 {
        return Some(first.1);
    }
    let (x0, y0) = points[i - 1];
    if x0 == at || i == points.len() {
        return Some(y0);
    }
    let (x1, y1) = points[i];
    Some(y0 + (y1 - y0) * (at - x0) / (x1 - x0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination of `y` explained by the fit.
    pub r2: f64,
}

/// Fit `y ≈ slope·x + intercept`. `None` with fewer than two points or
/// when either variable has zero variance.
pub fn fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let (dx, dy) = (xi - mean_x, yi - mean_y);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    Some(LinearFit {
        slope,
        intercept,
        r2: 1.0 - ss_res / syy,
    })
}
