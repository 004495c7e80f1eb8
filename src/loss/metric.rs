use serde::{Serialize, Deserialize};
use crate::math::matrix::Matrix;

/// Test-set metric tracked at every epoch.
///
/// Each metric yields a `(first, second)` pair:
/// - `L1`       — mean absolute error, and the same error relative to the mean |real|
/// - `L2`       — mean squared error, and the same error relative to the mean real²
/// - `Accuracy` — % of real positives predicted above `class_validity`, and %
///   of predicted positives that are wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    L1,
    L2,
    Accuracy,
}

impl Metric {
    /// Short name written in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::L1 => "mae",
            Metric::L2 => "mse",
            Metric::Accuracy => "accuracy",
        }
    }

    /// Metric pooled over every output.
    pub fn compute(&self, real: &Matrix, predicted: &Matrix, class_validity: f64) -> (f64, f64) {
        check_shapes(real, predicted);
        let pairs = real.data.iter()
            .flatten()
            .zip(predicted.data.iter().flatten())
            .map(|(&r, &p)| (r, p));
        self.evaluate(pairs, class_validity)
    }

    /// Metric for each output column separately.
    pub fn per_output(&self, real: &Matrix, predicted: &Matrix, class_validity: f64) -> (Vec<f64>, Vec<f64>) {
        check_shapes(real, predicted);
        (0..real.cols)
            .map(|j| {
                let pairs = real.data.iter()
                    .zip(&predicted.data)
                    .map(|(r, p)| (r[j], p[j]));
                self.evaluate(pairs, class_validity)
            })
            .unzip()
    }

    fn evaluate<I>(&self, pairs: I, class_validity: f64) -> (f64, f64)
    where
        I: Iterator<Item = (f64, f64)>,
    {
        match self {
            Metric::L1 => {
                let (error, scale) = mean_pair(pairs.map(|(r, p)| ((r - p).abs(), r.abs())));
                (error, ratio(error, scale))
            }
            Metric::L2 => {
                let (error, scale) = mean_pair(pairs.map(|(r, p)| ((r - p).powi(2), r * r)));
                (error, ratio(error, scale))
            }
            Metric::Accuracy => {
                let mut positives = 0usize;
                let mut validated = 0usize;
                let mut predicted_positives = 0usize;
                let mut false_positives = 0usize;
                for (r, p) in pairs {
                    let is_positive = r > 0.5;
                    let predicted_positive = p >= class_validity;
                    if is_positive {
                        positives += 1;
                        if predicted_positive {
                            validated += 1;
                        }
                    }
                    if predicted_positive {
                        predicted_positives += 1;
                        if !is_positive {
                            false_positives += 1;
                        }
                    }
                }
                (
                    100.0 * ratio(validated as f64, positives as f64),
                    100.0 * ratio(false_positives as f64, predicted_positives as f64),
                )
            }
        }
    }
}

fn check_shapes(real: &Matrix, predicted: &Matrix) {
    assert!(
        real.has_same_shape(predicted),
        "real ({}x{}) and predicted ({}x{}) must have the same shape",
        real.rows, real.cols, predicted.rows, predicted.cols
    );
}

fn mean_pair<I: Iterator<Item = (f64, f64)>>(values: I) -> (f64, f64) {
    let (mut a, mut b, mut n) = (0.0, 0.0, 0usize);
    for (x, y) in values {
        a += x;
        b += y;
        n += 1;
    }
    if n == 0 {
        (0.0, 0.0)
    } else {
        (a / n as f64, b / n as f64)
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}
