//! Deterministic in-process engine.
//!
//! [`StubEngine`] answers every call with a matrix computed by a plain
//! function, optionally after a delay. [`StubLoader`] hands it out (or fails)
//! and counts how often it was asked to load.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lipi_core::constants::{DEFAULT_MAX_SEQ_LENGTH, FEATURE_WIDTH};
use lipi_core::{FeatureSequence, LabelAlphabet, ProbabilityMatrix, RecognitionError, Result};
use ndarray::Array2;

use super::{InferenceEngine, ModelLoader, ModelMetadata};

type Responder = dyn Fn(&FeatureSequence) -> Result<ProbabilityMatrix> + Send + Sync;

/// Engine whose output is a pure function of its input.
pub struct StubEngine {
    metadata: ModelMetadata,
    alphabet: LabelAlphabet,
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl std::fmt::Debug for StubEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubEngine")
            .field("metadata", &self.metadata)
            .field("alphabet_size", &self.alphabet.len())
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl StubEngine {
    /// Engine answering with `responder`.
    pub fn new(
        alphabet: LabelAlphabet,
        responder: impl Fn(&FeatureSequence) -> Result<ProbabilityMatrix> + Send + Sync + 'static,
    ) -> Self {
        Self {
            metadata: ModelMetadata {
                name: "stub".to_string(),
                version: lipi_core::constants::VERSION.to_string(),
                feature_width: FEATURE_WIDTH,
                max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
                output_labels: Some(alphabet.len()),
            },
            alphabet,
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Engine that emits `label` with `probability` at each of `timesteps`
    /// rows and blank with the remainder.
    pub fn constant(
        alphabet: LabelAlphabet,
        label: usize,
        probability: f32,
        timesteps: usize,
    ) -> Result<Self> {
        if label >= alphabet.len() || alphabet.is_blank(label) {
            return Err(RecognitionError::Config(format!(
                "stub label {label} is blank or outside an alphabet of {}",
                alphabet.len()
            )));
        }
        let blank = alphabet.blank_index();
        let mut data = Array2::<f32>::zeros((timesteps, alphabet.len()));
        for mut row in data.rows_mut() {
            row[label] = probability;
            row[blank] = 1.0 - probability;
        }
        let matrix = ProbabilityMatrix::new(data);
        Ok(Self::new(alphabet, move |_| Ok(matrix.clone())))
    }

    /// Override the reported metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sleep before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `infer` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for StubEngine {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn alphabet(&self) -> &LabelAlphabet {
        &self.alphabet
    }

    async fn infer(&self, features: FeatureSequence) -> Result<ProbabilityMatrix> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&features)
    }
}

/// Loader handing out a fixed [`StubEngine`] or a fixed error.
#[derive(Debug)]
pub struct StubLoader {
    outcome: std::result::Result<Arc<StubEngine>, String>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl StubLoader {
    /// Loader that succeeds with `engine`.
    pub fn ready(engine: Arc<StubEngine>) -> Self {
        Self {
            outcome: Ok(engine),
            delay: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Loader that always fails with `ModelUnavailable(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Sleep before finishing each load.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `load` calls so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelLoader for StubLoader {
    async fn load(&self) -> Result<Arc<dyn InferenceEngine>> {
        let _ = self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(engine) => Ok(Arc::clone(engine) as Arc<dyn InferenceEngine>),
            Err(message) => Err(RecognitionError::ModelUnavailable(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn alphabet() -> LabelAlphabet {
        LabelAlphabet::new(vec!["<blank>".into(), "क".into(), "ख".into()], 0).unwrap()
    }

    #[tokio::test]
    async fn constant_engine_rows() {
        let engine = StubEngine::constant(alphabet(), 1, 0.9, 4).unwrap();
        let m = engine.infer(FeatureSequence::zeros(8)).await.unwrap();
        assert_eq!(m.timesteps(), 4);
        assert!((m.row(0)[1] - 0.9).abs() < 1e-6);
        assert!((m.row(0)[0] - 0.1).abs() < 1e-6);
        assert!(m.row(0)[2].abs() < f32::EPSILON);
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn constant_rejects_blank_label() {
        assert_matches!(
            StubEngine::constant(alphabet(), 0, 0.9, 4),
            Err(RecognitionError::Config(_))
        );
        assert!(StubEngine::constant(alphabet(), 7, 0.9, 4).is_err());
    }

    #[tokio::test]
    async fn responder_sees_features() {
        let engine = StubEngine::new(alphabet(), |features| {
            let rows = vec![vec![0.0, 1.0, 0.0]; features.content_len().max(1)];
            ProbabilityMatrix::from_rows(&rows)
        });
        let m = engine.infer(FeatureSequence::zeros(16)).await.unwrap();
        assert_eq!(m.timesteps(), 1);
    }

    #[tokio::test]
    async fn loader_counts_loads() {
        let engine = Arc::new(StubEngine::constant(alphabet(), 1, 0.9, 2).unwrap());
        let loader = StubLoader::ready(engine);
        let loaded = loader.load().await.unwrap();
        assert_eq!(loaded.metadata().name, "stub");
        assert_eq!(loader.loads(), 1);
    }

    #[tokio::test]
    async fn failing_loader() {
        let loader = StubLoader::failing("no weights");
        let Err(err) = loader.load().await else {
            panic!("failing loader produced an engine");
        };
        assert_matches!(err, RecognitionError::ModelUnavailable(m) if m == "no weights");
    }
}
