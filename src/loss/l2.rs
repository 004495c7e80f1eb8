use crate::math::matrix::Matrix;
use super::elementwise;

/// Squared-error loss; pair with a Linear output layer.
pub struct L2Loss;

impl L2Loss {
    /// Per-element `0.5·(real − predicted)²` and gradient `real − predicted`.
    pub fn loss(real: &Matrix, predicted: &Matrix) -> (Matrix, Matrix) {
        elementwise(real, predicted, |r, p| {
            let diff = r - p;
            (0.5 * diff * diff, diff)
        })
    }
}
