use serde::{Serialize, Deserialize};
use crate::math::matrix::Matrix;
use super::{BceLoss, CrossEntropyLoss, L1Loss, L2Loss};

/// Selects which loss function the training loop uses.
///
/// - `L1`                 — absolute error; pair with Linear output.
/// - `L2`                 — squared error; pair with Linear output.
/// - `CrossEntropy`       — categorical cross-entropy; pair with Linear output,
///   the softmax is part of the loss.
/// - `BinaryCrossEntropy` — pair with Sigmoid output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    L1,
    #[default]
    L2,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl Loss {
    /// Returns the per-element `(loss, gradient)` matrices.
    ///
    /// The same dispatch serves the per-batch backward pass and the loss
    /// reported over whole sets.
    pub fn compute(&self, real: &Matrix, predicted: &Matrix) -> (Matrix, Matrix) {
        match self {
            Loss::L1 => L1Loss::loss(real, predicted),
            Loss::L2 => L2Loss::loss(real, predicted),
            Loss::CrossEntropy => CrossEntropyLoss::loss(real, predicted),
            Loss::BinaryCrossEntropy => BceLoss::loss(real, predicted),
        }
    }
}

/// Mean over samples of the per-sample summed loss.
pub fn average_loss(loss: &Matrix) -> f64 {
    if loss.rows == 0 {
        return 0.0;
    }
    loss.sum() / loss.rows as f64
}
