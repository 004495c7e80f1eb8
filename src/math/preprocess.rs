use crate::math::matrix::Matrix;

/// Per-column `(center, scale)` pairs fitted on training data.
///
/// For standardization the pair is `(mean, standard deviation)`; for
/// normalization it is `(min, max)`.
pub type Scaling = Vec<(f64, f64)>;

/// Centers every column on zero mean and unit (population) deviation and
/// returns the fitted parameters.
pub fn standardize(m: &mut Matrix) -> Scaling {
    let n = m.rows as f64;
    let params: Scaling = (0..m.cols)
        .map(|j| {
            let mean = m.data.iter().map(|row| row[j]).sum::<f64>() / n;
            let variance = m.data.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n;
            (mean, variance.sqrt())
        })
        .collect();
    standardize_with(m, &params);
    params
}

/// Applies previously fitted standardization parameters.
/// Constant columns (zero deviation) are only centered; empty `params`
/// leave the matrix untouched.
///
/// # Panics
/// Panics if `params` is not empty and does not hold one pair per column.
pub fn standardize_with(m: &mut Matrix, params: &[(f64, f64)]) {
    check_columns(m, params);
    for row in m.data.iter_mut() {
        for (val, &(mean, dev)) in row.iter_mut().zip(params) {
            let dev = if dev.abs() < f64::EPSILON { 1.0 } else { dev };
            *val = (*val - mean) / dev;
        }
    }
}

/// Inverse of `standardize_with`.
pub fn destandardize_with(m: &mut Matrix, params: &[(f64, f64)]) {
    check_columns(m, params);
    for row in m.data.iter_mut() {
        for (val, &(mean, dev)) in row.iter_mut().zip(params) {
            let dev = if dev.abs() < f64::EPSILON { 1.0 } else { dev };
            *val = *val * dev + mean;
        }
    }
}

/// Rescales every column into `[0, 1]` and returns the fitted `(min, max)`.
pub fn normalize(m: &mut Matrix) -> Scaling {
    let params: Scaling = (0..m.cols)
        .map(|j| {
            m.data.iter().map(|row| row[j]).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), x| (lo.min(x), hi.max(x)),
            )
        })
        .collect();
    normalize_with(m, &params);
    params
}

/// Applies previously fitted `(min, max)` pairs.
/// A column with no range collapses to 0.
pub fn normalize_with(m: &mut Matrix, params: &[(f64, f64)]) {
    for row in m.data.iter_mut() {
        for (val, &(lb, ub)) in row.iter_mut().zip(params) {
            let range = ub - lb;
            *val = if range.abs() < f64::EPSILON { 0.0 } else { (*val - lb) / range };
        }
    }
}

/// Inverse of `normalize_with`.
pub fn denormalize_with(m: &mut Matrix, params: &[(f64, f64)]) {
    for row in m.data.iter_mut() {
        for (val, &(lb, ub)) in row.iter_mut().zip(params) {
            let range = ub - lb;
            *val = if range.abs() < f64::EPSILON { lb } else { *val * range + lb };
        }
    }
}

fn check_columns(m: &Matrix, params: &[(f64, f64)]) {
    assert!(
        params.is_empty() || params.len() == m.cols,
        "{} scaling pairs for {} columns",
        params.len(),
        m.cols
    );
}
