use crate::math::matrix::Matrix;
use super::elementwise;

/// Categorical cross-entropy on raw scores.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Computes `−real·log(softmax(predicted))` element-wise.
    ///
    /// The output layer stays Linear and the softmax is taken here, so the
    /// gradient w.r.t. the scores simplifies to `real − softmax(predicted)`.
    pub fn loss(real: &Matrix, predicted: &Matrix) -> (Matrix, Matrix) {
        let soft_max = predicted.softmax();
        elementwise(real, &soft_max, |r, s| {
            // skip 0·ln(0) when a non-target probability underflows
            let loss = if r == 0.0 { 0.0 } else { r * -s.ln() };
            (loss, r - s)
        })
    }
}
