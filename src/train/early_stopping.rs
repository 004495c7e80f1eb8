/// Outcome of one epoch for early stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New best loss: checkpoint the weights.
    Improved,
    /// No improvement, patience not exhausted yet.
    Waiting,
    /// More than `patience` epochs since the last improvement.
    Stop,
}

/// Plateau-relative early stopping.
///
/// A loss only improves on the best one when it is below `best * plateau`,
/// so with `plateau < 1` noise-level decreases do not reset the count.
/// Patience counts epochs since the last improvement.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    best_loss: f64,
    optimal_epoch: usize,
    plateau: f64,
    patience: usize,
}

impl EarlyStopping {
    /// Starts from the loss measured before training (epoch 0).
    pub fn new(baseline_loss: f64, plateau: f64, patience: usize) -> EarlyStopping {
        EarlyStopping {
            best_loss: baseline_loss,
            optimal_epoch: 0,
            plateau,
            patience,
        }
    }

    pub fn observe(&mut self, epoch: usize, loss: f64) -> Verdict {
        if loss < self.best_loss * self.plateau {
            self.best_loss = loss;
            self.optimal_epoch = epoch;
            Verdict::Improved
        } else if epoch - self.optimal_epoch > self.patience {
            Verdict::Stop
        } else {
            Verdict::Waiting
        }
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn optimal_epoch(&self) -> usize {
        self.optimal_epoch
    }
}
