//! Inference engine contract.
//!
//! The recognizer depends on a model only through [`InferenceEngine`]; how
//! the engine is built is hidden behind [`ModelLoader`]. Two implementations
//! ship with the crate:
//!
//! - [`stub`]: deterministic in-process engine for tests and demos
//! - `onnx` (feature `ort`): ONNX Runtime session over a model directory

pub mod model;
#[cfg(feature = "ort")]
pub mod onnx;
pub mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use lipi_core::{FeatureSequence, LabelAlphabet, ProbabilityMatrix, Result};
use serde::Serialize;

pub use model::{ModelManifest, ModelPaths, OutputKind, default_model_dir};
#[cfg(feature = "ort")]
pub use onnx::{OnnxEngine, OnnxModelLoader};
pub use stub::{StubEngine, StubLoader};

/// Identity and input contract of a loaded model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    /// Model name.
    pub name: String,
    /// Model version.
    pub version: String,
    /// Values per input frame.
    pub feature_width: usize,
    /// Input sequence length the model was exported with.
    pub max_seq_length: usize,
    /// Label dimension of the output tensor, when the model fixes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_labels: Option<usize>,
}

/// A loaded sequence model.
///
/// Implementations must be safe to call concurrently; model weights are
/// treated as read-only.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Model identity and input contract.
    fn metadata(&self) -> &ModelMetadata;

    /// Label alphabet matching the model's output columns.
    fn alphabet(&self) -> &LabelAlphabet;

    /// Run the model on one feature sequence.
    async fn infer(&self, features: FeatureSequence) -> Result<ProbabilityMatrix>;
}

/// Produces an engine. Called at most once per [`ModelHandle`](crate::ModelHandle).
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the model.
    async fn load(&self) -> Result<Arc<dyn InferenceEngine>>;
}
