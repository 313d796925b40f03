//! Decoding strategies and the comparator that ranks their results.

use lipi_core::{LabelAlphabet, ProbabilityMatrix};
use lipi_settings::StrategySettings;
use serde::Serialize;

use super::LabelPath;
use super::beam::BeamSearchDecoder;
use super::greedy::GreedyDecoder;

/// One way of turning a probability matrix into a label sequence.
pub trait DecodeStrategy: Send + Sync {
    /// Short identifier used in logs and results.
    fn name(&self) -> &'static str;

    /// Decode `matrix`, whose columns follow `alphabet`.
    fn decode(&self, matrix: &ProbabilityMatrix, alphabet: &LabelAlphabet) -> LabelPath;
}

/// Build a strategy from its settings entry.
pub fn strategy_from_settings(settings: &StrategySettings) -> Box<dyn DecodeStrategy> {
    match settings {
        StrategySettings::BeamSearch { beam_width } => Box::new(BeamSearchDecoder::new(*beam_width)),
        StrategySettings::Greedy => Box::new(GreedyDecoder),
    }
}

/// A post-filtered strategy result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Filtered text.
    pub text: String,
    /// Strategy confidence in `[0, 1]`.
    pub confidence: f64,
    /// Name of the strategy that produced it.
    pub strategy: &'static str,
}

/// Decides whether a new candidate replaces the current best.
pub trait ScoreComparator: Send + Sync {
    /// `true` if `candidate` should replace `incumbent`.
    fn is_better(&self, candidate: &Candidate, incumbent: &Candidate) -> bool;
}

/// Non-empty text beats empty text; otherwise strictly higher confidence wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfidenceComparator;

impl ScoreComparator for ConfidenceComparator {
    fn is_better(&self, candidate: &Candidate, incumbent: &Candidate) -> bool {
        match (candidate.text.is_empty(), incumbent.text.is_empty()) {
            (false, true) => true,
            (true, false) => false,
            _ => candidate.confidence > incumbent.confidence,
        }
    }
}
