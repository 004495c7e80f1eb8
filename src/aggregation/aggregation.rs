use serde::{Serialize, Deserialize};
use crate::math::matrix::{Matrix, Vector};

/// Combines a neuron's inputs with its weights into one pre-activation value.
///
/// - `Dot`      — `w·x + b`, one weight set.
/// - `Distance` — Minkowski distance `‖x − w‖ₚ + b`, one weight set.
/// - `Maxout`   — `max_k (w_k·x + b_k)` over the neuron's `k` weight sets.
///
/// `aggregate` also returns the index of the weight set that produced the
/// value, so the backward pass only touches that set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Dot,
    Distance { order: f64 },
    Maxout,
}

impl Aggregation {
    /// Number of weight sets a neuron needs when the layer asks for `k`.
    pub fn weight_sets(&self, k: usize) -> usize {
        match self {
            Aggregation::Maxout => k.max(1),
            _ => 1,
        }
    }

    pub fn aggregate(&self, input: &[f64], weights: &Matrix, bias: &[f64]) -> (f64, usize) {
        match self {
            Aggregation::Dot => (dot(input, &weights[0]) + bias[0], 0),
            Aggregation::Distance { order } => {
                (distance(input, &weights[0], *order) + bias[0], 0)
            }
            Aggregation::Maxout => {
                let first = (dot(input, &weights[0]) + bias[0], 0);
                weights.data.iter()
                    .zip(bias)
                    .enumerate()
                    .skip(1)
                    .map(|(i, (w, b))| (dot(input, w) + b, i))
                    .fold(first, |best, cur| if cur.0 > best.0 { cur } else { best })
            }
        }
    }

    /// Derivative of the aggregated value w.r.t. each weight of one set.
    pub fn prime(&self, input: &[f64], weights: &[f64]) -> Vector {
        match self {
            Aggregation::Dot | Aggregation::Maxout => input.to_vec(),
            Aggregation::Distance { order } => {
                distance_prime(input, weights, *order).into_iter().map(|d| -d).collect()
            }
        }
    }

    /// Derivative of the aggregated value w.r.t. each input.
    pub fn prime_input(&self, input: &[f64], weights: &[f64]) -> Vector {
        match self {
            Aggregation::Dot | Aggregation::Maxout => weights.to_vec(),
            Aggregation::Distance { order } => distance_prime(input, weights, *order),
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn distance(input: &[f64], weights: &[f64], order: f64) -> f64 {
    input.iter()
        .zip(weights)
        .map(|(x, w)| (x - w).abs().powf(order))
        .sum::<f64>()
        .powf(1.0 / order)
}

// d‖x − w‖ₚ / dx; the derivative w.r.t. w is its opposite.
fn distance_prime(input: &[f64], weights: &[f64], order: f64) -> Vector {
    let norm = distance(input, weights, order);
    if norm == 0.0 {
        return vec![0.0; input.len()];
    }
    let scale = norm.powf(1.0 - order);
    input.iter()
        .zip(weights)
        .map(|(x, w)| {
            let diff = x - w;
            diff.signum() * diff.abs().powf(order - 1.0) * scale
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maxout_selects_the_largest_set() {
        let weights = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let (value, index) = Aggregation::Maxout.aggregate(&[1.0, 3.0], &weights, &[0.0, 0.0]);
        assert_eq!((value, index), (3.0, 1));
    }

    #[test]
    fn euclidean_distance_matches_pythagoras() {
        let weights = Matrix::from_data(vec![vec![0.0, 0.0]]);
        let agg = Aggregation::Distance { order: 2.0 };
        let (value, _) = agg.aggregate(&[3.0, 4.0], &weights, &[0.0]);
        assert!((value - 5.0).abs() < 1e-12);
        let grad = agg.prime_input(&[3.0, 4.0], &weights[0]);
        assert!((grad[0] - 0.6).abs() < 1e-12);
        assert!((grad[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn zero_distance_has_zero_gradient() {
        let agg = Aggregation::Distance { order: 2.0 };
        assert_eq!(agg.prime(&[1.0, 1.0], &[1.0, 1.0]), vec![0.0, 0.0]);
    }
}
