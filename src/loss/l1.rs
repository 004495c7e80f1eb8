use crate::math::matrix::Matrix;
use super::elementwise;

/// Absolute-error loss; pair with a Linear output layer.
pub struct L1Loss;

impl L1Loss {
    /// Per-element `|real − predicted|` and its subgradient `sign(real − predicted)`
    /// (0 when equal).
    pub fn loss(real: &Matrix, predicted: &Matrix) -> (Matrix, Matrix) {
        elementwise(real, predicted, |r, p| {
            let diff = r - p;
            let grad = if diff > 0.0 { 1.0 } else if diff < 0.0 { -1.0 } else { 0.0 };
            (diff.abs(), grad)
        })
    }
}
