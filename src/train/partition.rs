use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{NetworkError, Result};
use crate::math::matrix::{Matrix, Vector};

/// Labeled examples: `(inputs, expected outputs)` pairs.
pub type Dataset = Vec<(Vector, Vector)>;

/// How many rows each partition receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    pub nb_batch: usize,
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// A shuffled dataset cut into train, validation and test matrices.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub nb_batch: usize,
    pub train_inputs: Matrix,
    pub train_outputs: Matrix,
    pub validation_inputs: Matrix,
    pub validation_outputs: Matrix,
    pub test_inputs: Matrix,
    pub test_outputs: Matrix,
}

/// Returns `(input length, output length)` once every sample agrees on them.
pub fn check_dataset(data: &Dataset) -> Result<(usize, usize)> {
    let (first_in, first_out) = data.first()
        .map(|(i, o)| (i.len(), o.len()))
        .ok_or_else(|| NetworkError::Data("the dataset is empty".to_string()))?;
    if first_in == 0 || first_out == 0 {
        return Err(NetworkError::Data("samples need at least one input and one output".to_string()));
    }
    if let Some(pos) = data.iter().position(|(i, o)| i.len() != first_in || o.len() != first_out) {
        return Err(NetworkError::Data(format!(
            "sample {pos} does not have {first_in} inputs and {first_out} outputs"
        )));
    }
    Ok((first_in, first_out))
}

/// Computes the partition sizes of `total` samples.
///
/// The batch count is the training share divided by the batch size, rounded
/// up when the incomplete batch is at least half full. Rows left outside the
/// batches are shared between validation and test in proportion to their
/// ratios, validation taking the rounded share and test the remainder, so the
/// three sizes always add up to `total`.
pub fn split_sizes(total: usize, batch_size: usize, validation_ratio: f64, test_ratio: f64) -> Result<SplitSizes> {
    let n = total as f64;
    let mut nb_batch = (n - validation_ratio * n - test_ratio * n).trunc() / batch_size as f64;
    if nb_batch.fract() >= 0.5 {
        nb_batch = nb_batch.trunc() + 1.0;
    }
    let nb_batch = nb_batch.trunc() as usize;
    let train = nb_batch * batch_size;

    if nb_batch == 0 || train >= total {
        return Err(NetworkError::Config(format!(
            "{total} samples cannot fill whole batches of {batch_size} and leave a validation set"
        )));
    }

    let rest = total - train;
    let share = validation_ratio / (validation_ratio + test_ratio);
    let validation = ((rest as f64 * share).round() as usize).clamp(1, rest);
    Ok(SplitSizes {
        nb_batch,
        train,
        validation,
        test: rest - validation,
    })
}

/// Shuffles `data` with `rng` and cuts it: training rows first, then
/// validation, then test.
pub fn partition<R: Rng + ?Sized>(
    mut data: Dataset,
    batch_size: usize,
    validation_ratio: f64,
    test_ratio: f64,
    rng: &mut R,
) -> Result<Partition> {
    let (nb_inputs, nb_outputs) = check_dataset(&data)?;
    let sizes = split_sizes(data.len(), batch_size, validation_ratio, test_ratio)?;
    data.shuffle(rng);

    let split = |rows: &[(Vector, Vector)]| {
        let mut inputs = Matrix::zeros(0, nb_inputs);
        let mut outputs = Matrix::zeros(0, nb_outputs);
        for (i, o) in rows {
            inputs.push_row(i.clone());
            outputs.push_row(o.clone());
        }
        (inputs, outputs)
    };

    let (train, rest) = data.split_at(sizes.train);
    let (validation, test) = rest.split_at(sizes.validation);
    let (train_inputs, train_outputs) = split(train);
    let (validation_inputs, validation_outputs) = split(validation);
    let (test_inputs, test_outputs) = split(test);

    tracing::debug!(
        train = sizes.train,
        validation = sizes.validation,
        test = sizes.test,
        batches = sizes.nb_batch,
        "dataset partitioned"
    );

    Ok(Partition {
        nb_batch: sizes.nb_batch,
        train_inputs,
        train_outputs,
        validation_inputs,
        validation_outputs,
        test_inputs,
        test_outputs,
    })
}
