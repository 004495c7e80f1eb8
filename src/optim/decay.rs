use serde::{Serialize, Deserialize};

/// Learning-rate schedule, evaluated once per epoch.
///
/// - `None`    — constant rate
/// - `Inverse` — `rate / (1 + constant·epoch)`
/// - `Exp`     — `rate · e^(−constant·epoch)`
/// - `Step`    — `rate · constant^⌊epoch / step⌋`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrDecay {
    #[default]
    None,
    Inverse,
    Exp,
    Step,
}

impl LrDecay {
    pub fn compute(&self, learning_rate: f64, epoch: usize, constant: f64, step: usize) -> f64 {
        match self {
            LrDecay::None => learning_rate,
            LrDecay::Inverse => learning_rate / (1.0 + constant * epoch as f64),
            LrDecay::Exp => learning_rate * (-constant * epoch as f64).exp(),
            LrDecay::Step => {
                let drops = if step == 0 { 0 } else { epoch / step };
                learning_rate * constant.powi(drops as i32)
            }
        }
    }
}
