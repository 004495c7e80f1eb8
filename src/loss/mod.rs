pub mod l1;
pub mod l2;
pub mod cross_entropy;
pub mod bce;
pub mod loss_type;
pub mod metric;

pub use l1::L1Loss;
pub use l2::L2Loss;
pub use cross_entropy::CrossEntropyLoss;
pub use bce::BceLoss;
pub use loss_type::{average_loss, Loss};
pub use metric::Metric;

use crate::math::matrix::Matrix;

/// Applies `f(real, predicted) -> (loss, gradient)` to every element pair.
///
/// # Panics
/// Panics if `real` and `predicted` differ in shape.
pub(crate) fn elementwise<F>(real: &Matrix, predicted: &Matrix, f: F) -> (Matrix, Matrix)
where
    F: Fn(f64, f64) -> (f64, f64),
{
    assert!(
        real.has_same_shape(predicted),
        "real ({}x{}) and predicted ({}x{}) must have the same shape",
        real.rows, real.cols, predicted.rows, predicted.cols
    );
    let mut loss = Matrix::zeros(real.rows, real.cols);
    let mut gradients = Matrix::zeros(real.rows, real.cols);
    for i in 0..real.rows {
        for j in 0..real.cols {
            let (l, g) = f(real[i][j], predicted[i][j]);
            loss[i][j] = l;
            gradients[i][j] = g;
        }
    }
    (loss, gradients)
}
