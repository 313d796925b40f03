//! Recognition entry point.
//!
//! ```text
//! StrokeSet → StrokeProcessor → InferenceEngine → CtcDecoder → TextCorrector → DecodedResult
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lipi_core::constants::FEATURE_WIDTH;
use lipi_core::{DecodedResult, RecognitionError, Result, StrokeSet};
use lipi_settings::LipiSettings;
use tracing::{debug, info, instrument};

use crate::decoder::{CtcDecoder, DecoderConfig};
use crate::engine::ModelLoader;
use crate::lifecycle::{DEFAULT_LOAD_TIMEOUT, ModelExpectations, ModelHandle, ModelState, ModelStatus};
use crate::processor::{ProcessorConfig, StrokeProcessor};

/// Default bound on one inference call.
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Post-recognition text hook. Plain text in, plain text out.
pub trait TextCorrector: Send + Sync {
    /// Return the corrected text.
    fn correct(&self, text: &str) -> String;
}

/// Returns its input unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCorrector;

impl TextCorrector for IdentityCorrector {
    fn correct(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Everything a [`Recognizer`] needs besides the model loader.
#[derive(Clone, Debug)]
pub struct RecognizerConfig {
    /// Preprocessing.
    pub processor: ProcessorConfig,
    /// Decoding.
    pub decoder: DecoderConfig,
    /// Bound on the model load.
    pub load_timeout: Duration,
    /// Bound on each inference call.
    pub inference_timeout: Duration,
    /// Alphabet size the model must have, if pinned.
    pub alphabet_size: Option<usize>,
    /// Blank index the model must use, if pinned.
    pub blank_index: Option<usize>,
    /// Model directory for file-backed loaders.
    pub model_dir: PathBuf,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self::from_settings(&LipiSettings::default())
    }
}

impl RecognizerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &LipiSettings) -> Self {
        Self {
            processor: ProcessorConfig::from_settings(&settings.processing),
            decoder: DecoderConfig::from_settings(&settings.decoding),
            load_timeout: Duration::from_millis(settings.model.load_timeout_ms),
            inference_timeout: Duration::from_millis(settings.model.inference_timeout_ms),
            alphabet_size: settings.model.alphabet_size,
            blank_index: settings.model.blank_index,
            model_dir: settings.model.resolved_model_dir(),
            intra_threads: settings.model.intra_threads,
        }
    }

    /// What the loaded model must match.
    pub fn expectations(&self) -> ModelExpectations {
        ModelExpectations {
            feature_width: FEATURE_WIDTH,
            max_seq_length: self.processor.max_seq_length,
            alphabet_size: self.alphabet_size,
            blank_index: self.blank_index,
        }
    }
}

/// Single entry point from strokes to text.
pub struct Recognizer {
    model: Arc<ModelHandle>,
    processor: StrokeProcessor,
    decoder: CtcDecoder,
    corrector: Option<Arc<dyn TextCorrector>>,
    inference_timeout: Duration,
}

impl std::fmt::Debug for Recognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recognizer")
            .field("model", &self.model)
            .field("processor", &self.processor)
            .field("decoder", &self.decoder)
            .field("corrector", &self.corrector.is_some())
            .field("inference_timeout", &self.inference_timeout)
            .finish()
    }
}

impl Recognizer {
    /// Build a recognizer with its own model handle.
    pub fn new(config: &RecognizerConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let load_timeout = if config.load_timeout.is_zero() {
            DEFAULT_LOAD_TIMEOUT
        } else {
            config.load_timeout
        };
        let model = Arc::new(ModelHandle::new(loader, config.expectations(), load_timeout));
        Self::with_model(config, model)
    }

    /// Build a recognizer over a shared model handle.
    pub fn with_model(config: &RecognizerConfig, model: Arc<ModelHandle>) -> Self {
        let inference_timeout = if config.inference_timeout.is_zero() {
            DEFAULT_INFERENCE_TIMEOUT
        } else {
            config.inference_timeout
        };
        Self {
            model,
            processor: StrokeProcessor::new(config.processor.clone()),
            decoder: CtcDecoder::new(&config.decoder),
            corrector: None,
            inference_timeout,
        }
    }

    /// Apply `corrector` to non-empty results.
    #[must_use]
    pub fn with_corrector(mut self, corrector: Arc<dyn TextCorrector>) -> Self {
        self.corrector = Some(corrector);
        self
    }

    /// Replace the decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: CtcDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// The shared model handle.
    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    /// Start loading the model in the background.
    pub fn preload(&self) -> tokio::task::JoinHandle<Result<()>> {
        self.model.preload()
    }

    /// Current model state.
    pub fn state(&self) -> ModelState {
        self.model.state()
    }

    /// Model status snapshot.
    pub fn status(&self) -> ModelStatus {
        self.model.status()
    }

    /// Release the model.
    pub fn shutdown(&self) {
        self.model.shutdown();
    }

    /// Recognize one stroke set.
    ///
    /// An empty stroke set returns an empty result without touching the
    /// model. Low-confidence results are returned as-is.
    #[instrument(skip_all, fields(strokes = strokes.len(), points = strokes.point_count()))]
    pub async fn recognize(&self, strokes: &StrokeSet) -> Result<DecodedResult> {
        let started = Instant::now();

        if strokes.point_count() == 0 {
            debug!("no strokes, skipping inference");
            return Ok(DecodedResult::empty(elapsed_ms(started)));
        }

        let lease = self.model.acquire().await?;
        let engine = lease.engine();

        let features = self.processor.process(strokes);
        debug!(frames = features.content_len(), "features ready");

        let matrix = tokio::time::timeout(self.inference_timeout, engine.infer(features))
            .await
            .map_err(|_| {
                RecognitionError::Inference(format!(
                    "inference timed out after {}ms",
                    self.inference_timeout.as_millis()
                ))
            })??;
        debug!(timesteps = matrix.timesteps(), labels = matrix.labels(), "model output");

        let best = self.decoder.decode(&matrix, engine.alphabet())?;
        drop(lease);

        let text = match &self.corrector {
            Some(corrector) if !best.text.is_empty() => corrector.correct(&best.text),
            _ => best.text,
        };

        let result = DecodedResult::new(text, best.confidence, elapsed_ms(started));
        info!(
            strategy = best.strategy,
            confidence = result.confidence,
            chars = result.text.chars().count(),
            timing_ms = result.timing_ms,
            "recognized"
        );
        Ok(result)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{StubEngine, StubLoader};
    use assert_matches::assert_matches;
    use lipi_core::logging::capture_logs;
    use lipi_core::{LabelAlphabet, Point, ProbabilityMatrix, Stroke};

    fn alphabet() -> LabelAlphabet {
        LabelAlphabet::new(vec!["<blank>".into(), "क".into(), "ख".into()], 0).unwrap()
    }

    fn strokes() -> StrokeSet {
        let points = (0..5u32)
            .map(|i| Point::down(f64::from(i) * 10.0, 0.0, u64::from(i)))
            .collect();
        StrokeSet::from(vec![Stroke::from_points(points).unwrap()])
    }

    fn recognizer_for(engine: StubEngine) -> (Recognizer, Arc<StubEngine>, Arc<StubLoader>) {
        let engine = Arc::new(engine);
        let loader = Arc::new(StubLoader::ready(Arc::clone(&engine)));
        let recognizer = Recognizer::new(&RecognizerConfig::default(), loader.clone());
        (recognizer, engine, loader)
    }

    #[tokio::test]
    async fn empty_input_skips_model() {
        let (recognizer, engine, loader) =
            recognizer_for(StubEngine::constant(alphabet(), 1, 0.9, 8).unwrap());
        let result = recognizer.recognize(&StrokeSet::new()).await.unwrap();
        assert!(result.is_empty());
        assert!(result.confidence.abs() < f64::EPSILON);
        assert_eq!(engine.calls(), 0);
        assert_eq!(loader.loads(), 0);
        assert_eq!(recognizer.state(), ModelState::Uninitialized);
    }

    #[tokio::test]
    async fn recognizes_constant_model() {
        let (recognizer, engine, _) =
            recognizer_for(StubEngine::constant(alphabet(), 1, 0.9, 8).unwrap());
        let result = recognizer.recognize(&strokes()).await.unwrap();
        assert_eq!(result.text, "क");
        assert!(result.confidence >= 0.9 - 1e-6);
        assert_eq!(engine.calls(), 1);
        assert_eq!(recognizer.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn failed_model_fails_fast() {
        let loader = Arc::new(StubLoader::failing("missing weights"));
        let recognizer = Recognizer::new(&RecognizerConfig::default(), loader.clone());
        assert_matches!(
            recognizer.recognize(&strokes()).await,
            Err(RecognitionError::ModelUnavailable(_))
        );
        assert_matches!(
            recognizer.recognize(&strokes()).await,
            Err(RecognitionError::ModelUnavailable(_))
        );
        assert_eq!(loader.loads(), 1);
        assert_eq!(recognizer.state(), ModelState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn inference_timeout_keeps_model_ready() {
        let engine = StubEngine::constant(alphabet(), 1, 0.9, 8)
            .unwrap()
            .with_delay(Duration::from_secs(60));
        let (recognizer, _, _) = recognizer_for(engine);
        assert_matches!(
            recognizer.recognize(&strokes()).await,
            Err(RecognitionError::Inference(m)) if m.contains("timed out")
        );
        assert_eq!(recognizer.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn inference_error_returns_to_ready() {
        let engine = StubEngine::new(alphabet(), |_| {
            Err(RecognitionError::Inference("session crashed".into()))
        });
        let (recognizer, _, _) = recognizer_for(engine);
        assert_matches!(
            recognizer.recognize(&strokes()).await,
            Err(RecognitionError::Inference(_))
        );
        assert_eq!(recognizer.state(), ModelState::Ready);
        assert_eq!(recognizer.status().in_flight, 0);
    }

    #[tokio::test]
    async fn wrong_output_width_is_config_error() {
        let engine = StubEngine::new(alphabet(), |_| {
            ProbabilityMatrix::from_rows(&[vec![0.5, 0.5]])
        });
        let (recognizer, _, _) = recognizer_for(engine);
        assert_matches!(
            recognizer.recognize(&strokes()).await,
            Err(RecognitionError::Config(_))
        );
    }

    #[tokio::test]
    async fn corrector_applied_to_text() {
        struct Suffix;
        impl TextCorrector for Suffix {
            fn correct(&self, text: &str) -> String {
                format!("{text}ा")
            }
        }
        let (recognizer, _, _) =
            recognizer_for(StubEngine::constant(alphabet(), 2, 0.9, 8).unwrap());
        let recognizer = recognizer.with_corrector(Arc::new(Suffix));
        let result = recognizer.recognize(&strokes()).await.unwrap();
        assert_eq!(result.text, "खा");
    }

    #[tokio::test]
    async fn identity_corrector_is_noop() {
        assert_eq!(IdentityCorrector.correct("नमस्ते"), "नमस्ते");
        let (recognizer, _, _) =
            recognizer_for(StubEngine::constant(alphabet(), 1, 0.9, 8).unwrap());
        let recognizer = recognizer.with_corrector(Arc::new(IdentityCorrector));
        assert_eq!(recognizer.recognize(&strokes()).await.unwrap().text, "क");
    }

    #[tokio::test]
    async fn shutdown_then_recognize_is_unavailable() {
        let (recognizer, _, _) =
            recognizer_for(StubEngine::constant(alphabet(), 1, 0.9, 8).unwrap());
        let _ = recognizer.recognize(&strokes()).await.unwrap();
        recognizer.shutdown();
        assert_matches!(
            recognizer.recognize(&strokes()).await,
            Err(RecognitionError::ModelUnavailable(_))
        );
    }

    #[tokio::test]
    async fn recognize_runs_in_span() {
        let (logs, _guard) = capture_logs();
        let (recognizer, _, _) =
            recognizer_for(StubEngine::constant(alphabet(), 1, 0.9, 8).unwrap());
        let _ = recognizer.recognize(&strokes()).await.unwrap();
        assert!(logs.has_span("recognize"));
        assert!(logs.has_message("recognized"));
    }

    #[test]
    fn config_from_settings() {
        let mut settings = LipiSettings::default();
        settings.processing.max_seq_length = 64;
        settings.model.inference_timeout_ms = 250;
        settings.model.alphabet_size = Some(3);
        let config = RecognizerConfig::from_settings(&settings);
        assert_eq!(config.processor.max_seq_length, 64);
        assert_eq!(config.inference_timeout, Duration::from_millis(250));
        let expectations = config.expectations();
        assert_eq!(expectations.max_seq_length, 64);
        assert_eq!(expectations.alphabet_size, Some(3));
        assert_eq!(expectations.feature_width, 3);
    }
}
