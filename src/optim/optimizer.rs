use serde::{Serialize, Deserialize};

/// Update rule applied to every weight and bias.
///
/// - `None`     — plain SGD
/// - `Momentum` — heavy-ball velocity (`momentum`)
/// - `Nesterov` — look-ahead momentum
/// - `Rmsprop`  — gradient scaled by a running RMS (`window`)
/// - `Adam`     — bias-corrected first (`momentum`) and second (`window`) moments
/// - `Amsgrad`  — Adam keeping the largest second moment seen so far
/// - `Nadam`    — Adam with a Nesterov first moment
/// - `Adadelta` — automatic learning rate from running squared updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimizer {
    #[default]
    None,
    Momentum,
    Nesterov,
    Rmsprop,
    Adam,
    Amsgrad,
    Nadam,
    Adadelta,
}

/// Gradient history of a single coefficient, carried from one update to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefState {
    /// Running first moment of the gradient.
    pub previous_grad: f64,
    /// Running second moment of the gradient.
    pub previous_grad2: f64,
    /// Largest second moment seen (AMSGrad).
    pub optimal_previous_grad2: f64,
    /// Last applied update, or the momentum velocity.
    pub previous_update: f64,
    /// Running second moment of the updates (Adadelta).
    pub previous_update2: f64,
}

/// Hyperparameters shared by every coefficient of one update step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateParams {
    pub optimizer: Optimizer,
    pub learning_rate: f64,
    pub momentum: f64,
    pub window: f64,
    /// Small constant keeping adaptive denominators away from zero.
    pub optimizer_bias: f64,
    /// 1-based count of updates already applied, used for bias correction.
    pub iteration: u64,
    pub l1: f64,
    pub l2: f64,
    pub decay: f64,
}

impl UpdateParams {
    /// Same step without L1/L2 penalties or weight decay, used for biases.
    pub fn without_penalty(&self) -> UpdateParams {
        UpdateParams { l1: 0.0, l2: 0.0, decay: 0.0, ..*self }
    }
}

/// Applies one update to `coef` and advances its history in `state`.
///
/// `gradient` points in the descent direction (the loss gradients of this
/// crate are `real − predicted`), so updates are added to the coefficient.
pub fn optimized_update(coef: &mut f64, state: &mut CoefState, gradient: f64, params: &UpdateParams) {
    let lr = params.learning_rate;
    let m = params.momentum;
    let w = params.window;
    let eps = params.optimizer_bias;
    let t = params.iteration.max(1) as f64;

    let sign = if *coef > 0.0 { 1.0 } else if *coef < 0.0 { -1.0 } else { 0.0 };
    let g = gradient - params.l2 * *coef - params.l1 * sign;

    // (applied step, value remembered as the previous update)
    let (step, remembered) = match params.optimizer {
        Optimizer::None => (lr * g, lr * g),
        Optimizer::Momentum => {
            let velocity = m * state.previous_update + lr * g;
            (velocity, velocity)
        }
        Optimizer::Nesterov => {
            let velocity = m * state.previous_update + lr * g;
            (m * velocity + lr * g, velocity)
        }
        Optimizer::Rmsprop => {
            state.previous_grad2 = w * state.previous_grad2 + (1.0 - w) * g * g;
            let step = lr * g / (state.previous_grad2.sqrt() + eps);
            (step, step)
        }
        Optimizer::Adam | Optimizer::Amsgrad | Optimizer::Nadam => {
            state.previous_grad = m * state.previous_grad + (1.0 - m) * g;
            state.previous_grad2 = w * state.previous_grad2 + (1.0 - w) * g * g;
            let correction = 1.0 - m.powf(t);
            let m_hat = state.previous_grad / correction;
            let first = if params.optimizer == Optimizer::Nadam {
                m * m_hat + (1.0 - m) * g / correction
            } else {
                m_hat
            };
            let second = if params.optimizer == Optimizer::Amsgrad {
                state.optimal_previous_grad2 = state.optimal_previous_grad2.max(state.previous_grad2);
                state.optimal_previous_grad2
            } else {
                state.previous_grad2 / (1.0 - w.powf(t))
            };
            let step = lr * first / (second.sqrt() + eps);
            (step, step)
        }
        Optimizer::Adadelta => {
            state.previous_grad2 = w * state.previous_grad2 + (1.0 - w) * g * g;
            let step = (state.previous_update2 + eps).sqrt() / (state.previous_grad2 + eps).sqrt() * g;
            state.previous_update2 = w * state.previous_update2 + (1.0 - w) * step * step;
            (step, step)
        }
    };

    state.previous_update = remembered;
    *coef += step - lr * params.decay * *coef;
}
