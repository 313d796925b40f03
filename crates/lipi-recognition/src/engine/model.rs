//! Model directory layout and manifest.
//!
//! ```text
//! <model_dir>/
//!   model.onnx      exported network
//!   alphabet.txt    one symbol per line, line index = label index
//!   manifest.json   name, version, blank index, input contract, output kind
//! ```

use std::path::{Path, PathBuf};

use lipi_core::constants::{DEFAULT_MAX_SEQ_LENGTH, FEATURE_WIDTH};
use lipi_core::{LabelAlphabet, ProbabilityMatrix, RecognitionError, Result, ResultExt};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::ModelMetadata;

/// Network file name.
pub const MODEL_FILE: &str = "model.onnx";
/// Alphabet file name.
pub const ALPHABET_FILE: &str = "alphabet.txt";
/// Manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Default model directory (`~/.lipi/models/devanagari`).
pub fn default_model_dir() -> PathBuf {
    lipi_settings::ModelSettings::default().resolved_model_dir()
}

/// Resolved paths of the files in a model directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPaths {
    /// `model.onnx`.
    pub model: PathBuf,
    /// `alphabet.txt`.
    pub alphabet: PathBuf,
    /// `manifest.json`.
    pub manifest: PathBuf,
}

impl ModelPaths {
    /// Paths inside `dir`.
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            model: dir.join(MODEL_FILE),
            alphabet: dir.join(ALPHABET_FILE),
            manifest: dir.join(MANIFEST_FILE),
        }
    }

    /// Files that do not exist.
    pub fn missing(&self) -> Vec<&Path> {
        [&self.model, &self.alphabet, &self.manifest]
            .into_iter()
            .filter(|p| !p.exists())
            .map(PathBuf::as_path)
            .collect()
    }

    /// Whether every file exists.
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// What the network's output tensor holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    /// Per-row probabilities.
    #[default]
    Probabilities,
    /// Unnormalized scores; softmax is applied per row.
    Logits,
    /// Per-label log-probabilities.
    LogProbabilities,
}

impl OutputKind {
    /// Convert a raw `[T, C]` output into probabilities.
    pub fn to_probabilities(self, raw: Array2<f32>) -> ProbabilityMatrix {
        match self {
            Self::Probabilities => ProbabilityMatrix::new(raw),
            Self::Logits => ProbabilityMatrix::from_logits(raw),
            Self::LogProbabilities => ProbabilityMatrix::from_log_probs(raw),
        }
    }
}

fn default_feature_width() -> usize {
    FEATURE_WIDTH
}

fn default_max_seq_length() -> usize {
    DEFAULT_MAX_SEQ_LENGTH
}

/// `manifest.json` contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelManifest {
    /// Model name.
    pub name: String,
    /// Model version.
    pub version: String,
    /// Index of the blank label in `alphabet.txt`.
    #[serde(default)]
    pub blank_index: usize,
    /// Values per input frame.
    #[serde(default = "default_feature_width")]
    pub feature_width: usize,
    /// Input sequence length.
    #[serde(default = "default_max_seq_length")]
    pub max_seq_length: usize,
    /// Output tensor kind.
    #[serde(default)]
    pub output: OutputKind,
}

impl ModelManifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .model(&format!("read {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest JSON.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(content).config("parse manifest.json")?;
        if manifest.feature_width != FEATURE_WIDTH {
            return Err(RecognitionError::Config(format!(
                "manifest declares feature width {}, pipeline produces {FEATURE_WIDTH}",
                manifest.feature_width
            )));
        }
        Ok(manifest)
    }

    /// Identity and input contract.
    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            name: self.name.clone(),
            version: self.version.clone(),
            feature_width: self.feature_width,
            max_seq_length: self.max_seq_length,
            output_labels: None,
        }
    }
}

/// Read `alphabet.txt` with the manifest's blank index.
pub fn load_alphabet(path: &Path, blank_index: usize) -> Result<LabelAlphabet> {
    let content = std::fs::read_to_string(path)
        .model(&format!("read {}", path.display()))?;
    LabelAlphabet::from_text(&content, blank_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ndarray::array;

    #[test]
    fn paths_inside_dir() {
        let paths = ModelPaths::from_dir(Path::new("/m"));
        assert_eq!(paths.model, PathBuf::from("/m/model.onnx"));
        assert_eq!(paths.alphabet, PathBuf::from("/m/alphabet.txt"));
        assert_eq!(paths.manifest, PathBuf::from("/m/manifest.json"));
    }

    #[test]
    fn missing_files_reported() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(ALPHABET_FILE), "_\nक\n").unwrap();
        let paths = ModelPaths::from_dir(tmp.path());
        assert!(!paths.is_complete());
        assert_eq!(paths.missing().len(), 2);
    }

    #[test]
    fn default_model_dir_under_lipi() {
        let dir = default_model_dir();
        let s = dir.to_string_lossy();
        assert!(s.contains(".lipi/models/devanagari"), "Got: {s}");
    }

    #[test]
    fn manifest_defaults() {
        let m = ModelManifest::parse(r#"{"name": "deva-ctc", "version": "1.2.0"}"#).unwrap();
        assert_eq!(m.blank_index, 0);
        assert_eq!(m.feature_width, 3);
        assert_eq!(m.max_seq_length, 256);
        assert_eq!(m.output, OutputKind::Probabilities);
        assert_eq!(m.metadata().name, "deva-ctc");
    }

    #[test]
    fn manifest_full() {
        let m = ModelManifest::parse(
            r#"{"name": "n", "version": "v", "blankIndex": 5, "maxSeqLength": 128, "output": "logProbabilities"}"#,
        )
        .unwrap();
        assert_eq!(m.blank_index, 5);
        assert_eq!(m.max_seq_length, 128);
        assert_eq!(m.output, OutputKind::LogProbabilities);
    }

    #[test]
    fn manifest_rejects_wrong_feature_width() {
        let result = ModelManifest::parse(r#"{"name": "n", "version": "v", "featureWidth": 4}"#);
        assert_matches!(result, Err(RecognitionError::Config(_)));
    }

    #[test]
    fn manifest_rejects_bad_json() {
        assert_matches!(ModelManifest::parse("{"), Err(RecognitionError::Config(_)));
    }

    #[test]
    fn missing_manifest_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let result = ModelManifest::load(&tmp.path().join(MANIFEST_FILE));
        assert_matches!(result, Err(RecognitionError::ModelUnavailable(_)));
    }

    #[test]
    fn alphabet_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(ALPHABET_FILE);
        std::fs::write(&path, "<blank>\nक\nख\n").unwrap();
        let alphabet = load_alphabet(&path, 0).unwrap();
        assert_eq!(alphabet.len(), 3);
        assert_eq!(alphabet.symbol(2), Some("ख"));
    }

    #[test]
    fn output_kinds_convert() {
        let logits = OutputKind::Logits.to_probabilities(array![[0.0, 0.0]]);
        assert!((logits.row(0)[0] - 0.5).abs() < 1e-6);
        let logp = OutputKind::LogProbabilities.to_probabilities(array![[0.5f32.ln(), 0.5f32.ln()]]);
        assert!((logp.row(0)[1] - 0.5).abs() < 1e-6);
        let probs = OutputKind::Probabilities.to_probabilities(array![[0.2, 0.8]]);
        assert!((probs.row(0)[1] - 0.8).abs() < 1e-6);
    }
}
