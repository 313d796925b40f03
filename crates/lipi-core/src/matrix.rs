//! Per-timestep label probabilities produced by the model.

use ndarray::{Array2, ArrayView1, Axis};

use crate::errors::{RecognitionError, Result};

/// `T × |alphabet|` matrix of label probabilities; each row sums to ≈1.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityMatrix {
    data: Array2<f32>,
}

impl ProbabilityMatrix {
    /// Wrap a matrix that already holds probabilities.
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Build from rows, rejecting ragged input.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some((t, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(RecognitionError::Inference(format!(
                "ragged probability matrix: row {t} has {} labels, expected {width}",
                row.len()
            )));
        }
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| RecognitionError::Inference(format!("reshape matrix: {e}")))?;
        Ok(Self { data })
    }

    /// Convert raw logits with a numerically stable row-wise softmax.
    pub fn from_logits(mut logits: Array2<f32>) -> Self {
        for mut row in logits.axis_iter_mut(Axis(0)) {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            row.mapv_inplace(|v| (v - max).exp());
            let sum: f32 = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|v| v / sum);
            }
        }
        Self { data: logits }
    }

    /// Convert per-label log-probabilities.
    pub fn from_log_probs(log_probs: Array2<f32>) -> Self {
        Self {
            data: log_probs.mapv(f32::exp),
        }
    }

    /// Number of output timesteps `T`.
    pub fn timesteps(&self) -> usize {
        self.data.nrows()
    }

    /// Number of labels per timestep.
    pub fn labels(&self) -> usize {
        self.data.ncols()
    }

    /// Whether there are no timesteps.
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Probabilities at timestep `t`.
    pub fn row(&self, t: usize) -> ArrayView1<'_, f32> {
        self.data.row(t)
    }

    /// Iterate over timestep rows.
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> {
        self.data.axis_iter(Axis(0))
    }

    /// Underlying matrix.
    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn from_rows_shape() {
        let m = ProbabilityMatrix::from_rows(&[vec![0.1, 0.9], vec![0.5, 0.5], vec![1.0, 0.0]])
            .unwrap();
        assert_eq!(m.timesteps(), 3);
        assert_eq!(m.labels(), 2);
        assert!((m.row(0)[1] - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let result = ProbabilityMatrix::from_rows(&[vec![0.5, 0.5], vec![1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn from_rows_empty() {
        let m = ProbabilityMatrix::from_rows(&[]).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let m = ProbabilityMatrix::from_logits(array![[1.0, 2.0, 3.0], [1000.0, 0.0, -1000.0]]);
        for row in m.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
        assert!(m.row(0)[2] > m.row(0)[1]);
        assert!((m.row(1)[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn log_probs_exponentiate() {
        let m = ProbabilityMatrix::from_log_probs(array![[0.25f32.ln(), 0.75f32.ln()]]);
        assert!((m.row(0)[0] - 0.25).abs() < 1e-6);
        assert!((m.row(0)[1] - 0.75).abs() < 1e-6);
    }
}
