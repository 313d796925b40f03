//! CTC decoding: `ProbabilityMatrix → text + confidence`.
//!
//! [`CtcDecoder`] runs an ordered list of [`DecodeStrategy`]s. Each result is
//! rendered through the alphabet and cleaned by [`PostFilter`]; a
//! [`ScoreComparator`] keeps the best so far. The chain stops at the first
//! non-empty result whose confidence reaches the threshold.

pub mod beam;
pub mod greedy;
pub mod postfilter;
pub mod strategy;

pub use beam::{BeamSearchDecoder, beam_search};
pub use greedy::{GreedyDecoder, greedy_decode};
pub use postfilter::PostFilter;
pub use strategy::{
    Candidate, ConfidenceComparator, DecodeStrategy, ScoreComparator, strategy_from_settings,
};

use lipi_core::constants::DEFAULT_CONFIDENCE_THRESHOLD;
use lipi_core::{LabelAlphabet, ProbabilityMatrix, RecognitionError, Result};
use lipi_settings::{DecodingSettings, ScriptRange, StrategySettings};
use tracing::debug;

/// Collapsed label sequence with its confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelPath {
    /// Non-blank labels after CTC collapsing.
    pub labels: Vec<usize>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Decoder parameters.
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// Strategies in evaluation order.
    pub strategies: Vec<StrategySettings>,
    /// Confidence at which later strategies are skipped.
    pub confidence_threshold: f64,
    /// Scripts accepted by the post-filter.
    pub target_scripts: Vec<ScriptRange>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::from_settings(&DecodingSettings::default())
    }
}

impl DecoderConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &DecodingSettings) -> Self {
        Self {
            strategies: settings.strategies.clone(),
            confidence_threshold: settings.confidence_threshold,
            target_scripts: settings.target_scripts.clone(),
        }
    }
}

/// Strategy-chain CTC decoder.
pub struct CtcDecoder {
    strategies: Vec<Box<dyn DecodeStrategy>>,
    comparator: Box<dyn ScoreComparator>,
    confidence_threshold: f64,
    filter: PostFilter,
}

impl std::fmt::Debug for CtcDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("CtcDecoder")
            .field("strategies", &names)
            .field("confidence_threshold", &self.confidence_threshold)
            .finish_non_exhaustive()
    }
}

impl Default for CtcDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl CtcDecoder {
    /// Build a decoder with the [`ConfidenceComparator`].
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            strategies: config
                .strategies
                .iter()
                .map(strategy_from_settings)
                .collect(),
            comparator: Box::new(ConfidenceComparator),
            confidence_threshold: config.confidence_threshold,
            filter: PostFilter::new(config.target_scripts.clone()),
        }
    }

    /// Build a decoder from explicit strategies.
    pub fn with_strategies(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self {
            strategies,
            comparator: Box::new(ConfidenceComparator),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            filter: PostFilter::default(),
        }
    }

    /// Replace the comparator.
    #[must_use]
    pub fn with_comparator(mut self, comparator: Box<dyn ScoreComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    /// Replace the confidence threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Replace the post-filter.
    #[must_use]
    pub fn with_filter(mut self, filter: PostFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Decode `matrix` into the best candidate.
    ///
    /// Fails with [`RecognitionError::Config`] when the matrix width does not
    /// match the alphabet, and with [`RecognitionError::Decode`] when there is
    /// nothing to decode.
    pub fn decode(&self, matrix: &ProbabilityMatrix, alphabet: &LabelAlphabet) -> Result<Candidate> {
        if matrix.labels() != alphabet.len() {
            return Err(RecognitionError::Config(format!(
                "model emits {} labels but alphabet has {}",
                matrix.labels(),
                alphabet.len()
            )));
        }
        if matrix.is_empty() {
            return Err(RecognitionError::Decode("probability matrix has no timesteps".into()));
        }

        let mut best: Option<Candidate> = None;
        for strategy in &self.strategies {
            let path = strategy.decode(matrix, alphabet);
            let candidate = Candidate {
                text: self.filter.apply(&alphabet.render(&path.labels)),
                confidence: path.confidence.clamp(0.0, 1.0),
                strategy: strategy.name(),
            };
            debug!(
                strategy = candidate.strategy,
                confidence = candidate.confidence,
                chars = candidate.text.chars().count(),
                "strategy result"
            );

            let replace = best
                .as_ref()
                .is_none_or(|incumbent| self.comparator.is_better(&candidate, incumbent));
            if replace {
                best = Some(candidate);
            }

            let confident = best.as_ref().is_some_and(|b| {
                !b.text.is_empty() && b.confidence >= self.confidence_threshold
            });
            if confident {
                break;
            }
        }

        best.ok_or_else(|| RecognitionError::Decode("no decoding strategies configured".into()))
    }
}
