//! CTC prefix beam search.
//!
//! Hypotheses are keyed by `(prefix, ending)` where the ending records
//! whether the last consumed timestep was blank. Each key is scored by the
//! best single alignment path reaching it. After each timestep only the
//! `width` highest-scoring keys survive.
//!
//! The arg-max extension of the best surviving key is always scored at least
//! as high as the greedy path up to that timestep, so the final best prefix
//! never scores below the greedy path.

use std::cmp::Ordering;
use std::collections::HashMap;

use lipi_core::{LabelAlphabet, ProbabilityMatrix};

use super::LabelPath;
use super::strategy::DecodeStrategy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Ending {
    Blank,
    Label,
}

type Key = (Vec<usize>, Ending);

/// Keep the better of the existing and the new path score for `key`.
fn accumulate<K: Eq + std::hash::Hash>(beams: &mut HashMap<K, f64>, key: K, score: f64) {
    let slot = beams.entry(key).or_insert(f64::NEG_INFINITY);
    *slot = slot.max(score);
}

/// Highest score first; ties broken by key so output is deterministic.
fn by_score_desc<K: Ord>(a: &(K, f64), b: &(K, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Decode with a beam of `width` hypotheses.
///
/// Confidence is the best path's probability normalized per timestep:
/// `exp(ln P / T)`.
pub fn beam_search(matrix: &ProbabilityMatrix, blank: usize, width: usize) -> LabelPath {
    let width = width.max(1);
    let mut beams: Vec<(Key, f64)> = vec![((Vec::new(), Ending::Blank), 0.0)];

    for row in matrix.rows() {
        let log_probs: Vec<f64> = row.iter().map(|&p| f64::from(p).ln()).collect();
        let mut next: HashMap<Key, f64> = HashMap::with_capacity(beams.len() * log_probs.len());

        for ((prefix, ending), score) in &beams {
            for (label, &lp) in log_probs.iter().enumerate() {
                if lp == f64::NEG_INFINITY {
                    continue;
                }
                let extended = score + lp;
                if label == blank {
                    accumulate(&mut next, (prefix.clone(), Ending::Blank), extended);
                } else if *ending == Ending::Label && prefix.last() == Some(&label) {
                    accumulate(&mut next, (prefix.clone(), Ending::Label), extended);
                } else {
                    let mut longer = prefix.clone();
                    longer.push(label);
                    accumulate(&mut next, (longer, Ending::Label), extended);
                }
            }
        }

        let mut ranked: Vec<(Key, f64)> = next.into_iter().collect();
        ranked.sort_by(by_score_desc);
        ranked.truncate(width);
        if ranked.is_empty() {
            // every label had zero probability at this timestep
            return LabelPath {
                labels: Vec::new(),
                confidence: 0.0,
            };
        }
        beams = ranked;
    }

    let mut merged: HashMap<Vec<usize>, f64> = HashMap::new();
    for ((prefix, _), score) in beams {
        accumulate(&mut merged, prefix, score);
    }
    let mut finals: Vec<(Vec<usize>, f64)> = merged.into_iter().collect();
    finals.sort_by(by_score_desc);

    match finals.into_iter().next() {
        Some((labels, score)) if !matrix.is_empty() => {
            #[allow(clippy::cast_precision_loss)]
            let confidence = (score / matrix.timesteps() as f64).exp();
            LabelPath { labels, confidence }
        }
        _ => LabelPath {
            labels: Vec::new(),
            confidence: 0.0,
        },
    }
}

/// [`beam_search`] as a decoding strategy.
#[derive(Clone, Copy, Debug)]
pub struct BeamSearchDecoder {
    width: usize,
}

impl BeamSearchDecoder {
    /// Beam search keeping `width` hypotheses (at least one).
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    /// Beam width.
    pub fn width(&self) -> usize {
        self.width
    }
}

impl Default for BeamSearchDecoder {
    fn default() -> Self {
        Self::new(lipi_core::constants::DEFAULT_BEAM_WIDTH)
    }
}

impl DecodeStrategy for BeamSearchDecoder {
    fn name(&self) -> &'static str {
        "beamSearch"
    }

    fn decode(&self, matrix: &ProbabilityMatrix, alphabet: &LabelAlphabet) -> LabelPath {
        beam_search(matrix, alphabet.blank_index(), self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::greedy::greedy_decode;
    use proptest::prelude::*;

    const BLANK: usize = 0;
    const KA: usize = 1;
    const KHA: usize = 2;

    fn matrix(rows: &[[f32; 3]]) -> ProbabilityMatrix {
        let rows: Vec<Vec<f32>> = rows.iter().map(|r| r.to_vec()).collect();
        ProbabilityMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn blank_separated_repeat() {
        let m = matrix(&[[0.05, 0.9, 0.05], [0.9, 0.05, 0.05], [0.05, 0.9, 0.05]]);
        assert_eq!(beam_search(&m, BLANK, 10).labels, vec![KA, KA]);
    }

    #[test]
    fn adjacent_repeat_collapses() {
        let m = matrix(&[[0.05, 0.9, 0.05], [0.05, 0.9, 0.05], [0.9, 0.05, 0.05]]);
        assert_eq!(beam_search(&m, BLANK, 10).labels, vec![KA]);
    }

    #[test]
    fn constant_label_decodes_once() {
        // Gapped paths like क-क outnumber the unbroken one but each scores lower.
        let rows = vec![[0.1, 0.9, 0.0]; 64];
        let beam = beam_search(&matrix(&rows), BLANK, 10);
        assert_eq!(beam.labels, vec![KA]);
        assert!((beam.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn scores_best_path_not_prefix_sum() {
        // Summed over paths "क" would reach 0.64, but its best path is 0.24.
        let m = matrix(&[[0.6, 0.4, 0.0], [0.6, 0.4, 0.0]]);
        let beam = beam_search(&m, BLANK, 10);
        assert!(beam.labels.is_empty());
        assert!((beam.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn width_one_still_decodes() {
        let m = matrix(&[[0.1, 0.1, 0.8], [0.8, 0.1, 0.1], [0.1, 0.8, 0.1]]);
        assert_eq!(beam_search(&m, BLANK, 1).labels, vec![KHA, KA]);
    }

    #[test]
    fn empty_matrix() {
        let m = ProbabilityMatrix::from_rows(&[]).unwrap();
        let path = beam_search(&m, BLANK, 10);
        assert!(path.labels.is_empty());
        assert!(path.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn zero_row_yields_empty() {
        let m = matrix(&[[0.0, 0.0, 0.0]]);
        let path = beam_search(&m, BLANK, 10);
        assert!(path.labels.is_empty());
        assert!(path.confidence.abs() < f64::EPSILON);
    }

    fn arb_matrix() -> impl Strategy<Value = ProbabilityMatrix> {
        (1usize..12, 2usize..6).prop_flat_map(|(t, c)| {
            prop::collection::vec(prop::collection::vec(0.001f32..1.0, c), t).prop_map(|rows| {
                let rows: Vec<Vec<f32>> = rows
                    .into_iter()
                    .map(|r| {
                        let sum: f32 = r.iter().sum();
                        r.into_iter().map(|v| v / sum).collect()
                    })
                    .collect();
                ProbabilityMatrix::from_rows(&rows).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn beam_confidence_at_least_greedy(m in arb_matrix(), width in 1usize..8) {
            let greedy = greedy_decode(&m, BLANK);
            let beam = beam_search(&m, BLANK, width);
            prop_assert!(
                beam.confidence + 1e-9 >= greedy.confidence,
                "beam {} < greedy {}", beam.confidence, greedy.confidence
            );
        }

        #[test]
        fn beam_confidence_in_unit_interval(m in arb_matrix()) {
            let beam = beam_search(&m, BLANK, 10);
            prop_assert!(beam.confidence >= 0.0);
            prop_assert!(beam.confidence <= 1.0 + 1e-6);
        }

        #[test]
        fn beam_never_emits_blank(m in arb_matrix()) {
            prop_assert!(!beam_search(&m, BLANK, 4).labels.contains(&BLANK));
        }
    }
}
