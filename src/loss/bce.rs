use crate::math::matrix::Matrix;
use super::elementwise;

/// Binary cross-entropy; pair with a Sigmoid output layer so every
/// prediction lies strictly inside (0, 1).
pub struct BceLoss;

impl BceLoss {
    /// Per-element `−(r·ln p + (1 − r)·ln(1 − p))` and gradient
    /// `(r − p) / (p·(1 − p))`.
    ///
    /// No epsilon guard: a prediction of exactly 0 or 1 yields an infinite or
    /// NaN loss and gradient, which the training loop reports as divergence.
    pub fn loss(real: &Matrix, predicted: &Matrix) -> (Matrix, Matrix) {
        elementwise(real, predicted, |r, p| {
            let loss = -(r * p.ln() + (1.0 - r) * (1.0 - p).ln());
            let grad = (r - p) / (p * (1.0 - p));
            (loss, grad)
        })
    }
}
