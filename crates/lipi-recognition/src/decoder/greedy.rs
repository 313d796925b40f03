//! Best-path CTC decoding.

use lipi_core::{LabelAlphabet, ProbabilityMatrix};

use super::LabelPath;
use super::strategy::DecodeStrategy;

/// Take the arg-max label per timestep, collapse repeats, drop blanks.
///
/// Confidence is the geometric mean of the chosen labels' probabilities.
pub fn greedy_decode(matrix: &ProbabilityMatrix, blank: usize) -> LabelPath {
    let mut labels = Vec::new();
    let mut log_sum = 0.0f64;
    let mut prev: Option<usize> = None;

    for row in matrix.rows() {
        let (best, p) = argmax(row.iter().copied());
        log_sum += f64::from(p).ln();
        if best != blank && prev != Some(best) {
            labels.push(best);
        }
        prev = Some(best);
    }

    #[allow(clippy::cast_precision_loss)]
    let confidence = if matrix.is_empty() {
        0.0
    } else {
        (log_sum / matrix.timesteps() as f64).exp()
    };
    LabelPath { labels, confidence }
}

/// Index and value of the largest element; the first one wins ties.
fn argmax(values: impl Iterator<Item = f32>) -> (usize, f32) {
    values
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, v)| {
            if v > bv { (i, v) } else { (bi, bv) }
        })
}

/// [`greedy_decode`] as a decoding strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedyDecoder;

impl DecodeStrategy for GreedyDecoder {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn decode(&self, matrix: &ProbabilityMatrix, alphabet: &LabelAlphabet) -> LabelPath {
        greedy_decode(matrix, alphabet.blank_index())
    }
}
