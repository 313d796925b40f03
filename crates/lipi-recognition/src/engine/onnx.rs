//! ONNX Runtime engine (feature-gated behind `ort`).
//!
//! The session takes one `[1, maxSeqLength, 3]` f32 input and returns
//! `[1, T, |alphabet|]` or `[T, |alphabet|]`. Session creation and every run
//! happen on the blocking pool.
//!
//! ONNX tensor shapes use `i64` dimensions while Rust indexing needs `usize`.
//! These casts are safe because tensor dimensions are small positive values.
#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lipi_core::constants::FEATURE_WIDTH;
use lipi_core::{
    FeatureSequence, LabelAlphabet, ProbabilityMatrix, RecognitionError, Result, ResultExt,
};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::model::{ModelManifest, ModelPaths, OutputKind, load_alphabet};
use super::{InferenceEngine, ModelLoader, ModelMetadata};

/// Engine backed by one ONNX Runtime session.
///
/// The session sits behind a mutex since `Session::run` requires `&mut self`.
pub struct OnnxEngine {
    session: Arc<Mutex<Session>>,
    metadata: ModelMetadata,
    alphabet: LabelAlphabet,
    output: OutputKind,
}

impl OnnxEngine {
    /// Load a model directory. Blocking; call from the blocking pool.
    pub fn load_blocking(model_dir: &Path, intra_threads: usize) -> Result<Self> {
        let paths = ModelPaths::from_dir(model_dir);
        let missing = paths.missing();
        if !missing.is_empty() {
            return Err(RecognitionError::ModelUnavailable(format!(
                "model directory {} is missing {missing:?}",
                model_dir.display()
            )));
        }

        let manifest = ModelManifest::load(&paths.manifest)?;
        let alphabet = load_alphabet(&paths.alphabet, manifest.blank_index)?;

        info!(
            model = %paths.model.display(),
            name = %manifest.name,
            version = %manifest.version,
            "loading ONNX model"
        );
        let session = Session::builder()
            .model("session builder")?
            .with_intra_threads(intra_threads)
            .model("set threads")?
            .with_log_level(ort::logging::LogLevel::Warning)
            .model("log level")?
            .commit_from_file(&paths.model)
            .model("load model")?;
        let mut metadata = manifest.metadata();
        metadata.output_labels = output_labels(&session);
        debug!(
            alphabet_size = alphabet.len(),
            blank = alphabet.blank_index(),
            output_labels = ?metadata.output_labels,
            "ONNX session ready"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            metadata,
            alphabet,
            output: manifest.output,
        })
    }
}

/// Static label dimension of the first output, if the graph declares one.
fn output_labels(session: &Session) -> Option<usize> {
    let shape = session.outputs().first()?.dtype().tensor_shape()?;
    let last = *shape.iter().last()?;
    (last > 0).then_some(last as usize)
}

/// Run the session on one sequence (CPU-bound, must be on a blocking thread).
fn run_session(
    session: &Mutex<Session>,
    features: &FeatureSequence,
    output: OutputKind,
) -> Result<ProbabilityMatrix> {
    let shape = [1i64, features.len() as i64, FEATURE_WIDTH as i64];
    let input = Tensor::from_array((shape, features.to_flat())).inference("input tensor")?;

    let mut session = session.lock();
    let outputs = session.run(ort::inputs![input]).inference("session run")?;
    let (out_shape, data) = outputs[0]
        .try_extract_tensor::<f32>()
        .inference("extract output")?;

    let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
    let (timesteps, labels) = match dims.as_slice() {
        [1, t, c] | [t, c] => (*t, *c),
        _ => {
            return Err(RecognitionError::Inference(format!(
                "unexpected output shape: {dims:?}"
            )));
        }
    };
    let raw = Array2::from_shape_vec((timesteps, labels), data.to_vec())
        .inference("reshape output")?;
    Ok(output.to_probabilities(raw))
}

#[async_trait]
impl InferenceEngine for OnnxEngine {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn alphabet(&self) -> &LabelAlphabet {
        &self.alphabet
    }

    async fn infer(&self, features: FeatureSequence) -> Result<ProbabilityMatrix> {
        let session = Arc::clone(&self.session);
        let output = self.output;
        tokio::task::spawn_blocking(move || run_session(&session, &features, output))
            .await
            .inference("inference task")?
    }
}

/// Loads an [`OnnxEngine`] from a model directory.
#[derive(Clone, Debug)]
pub struct OnnxModelLoader {
    model_dir: PathBuf,
    intra_threads: usize,
}

impl OnnxModelLoader {
    /// Loader for `model_dir` using `intra_threads` ONNX Runtime threads.
    pub fn new(model_dir: PathBuf, intra_threads: usize) -> Self {
        Self {
            model_dir,
            intra_threads: intra_threads.max(1),
        }
    }

    /// Directory this loader reads.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load(&self) -> Result<Arc<dyn InferenceEngine>> {
        let dir = self.model_dir.clone();
        let threads = self.intra_threads;
        let engine = tokio::task::spawn_blocking(move || OnnxEngine::load_blocking(&dir, threads))
            .await
            .model("load task")??;
        Ok(Arc::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn onnx_engine_implements_trait() {
        fn assert_engine<T: InferenceEngine>() {}
        assert_engine::<OnnxEngine>();
    }

    #[test]
    fn empty_dir_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let result = OnnxEngine::load_blocking(tmp.path(), 1);
        assert_matches!(result.map(|_| ()), Err(RecognitionError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn loader_propagates_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = OnnxModelLoader::new(tmp.path().to_path_buf(), 0);
        assert!(loader.load().await.is_err());
    }

    // Requires a real model directory — run with `cargo test --features ort -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn default_model_loads() {
        let loader = OnnxModelLoader::new(super::super::default_model_dir(), 2);
        let engine = loader.load().await.unwrap();
        let seq = FeatureSequence::zeros(engine.metadata().max_seq_length);
        let matrix = engine.infer(seq).await.unwrap();
        assert_eq!(matrix.labels(), engine.alphabet().len());
    }
}
