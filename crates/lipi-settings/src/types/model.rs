//! Model artifact and runtime settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Model artifact location and load/inference bounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Model directory. Relative paths resolve against `~/.lipi`; a leading
    /// `~/` expands to the home directory.
    pub model_dir: String,
    /// Upper bound on a model load, in milliseconds.
    pub load_timeout_ms: u64,
    /// Upper bound on a single inference call, in milliseconds.
    pub inference_timeout_ms: u64,
    /// ONNX Runtime intra-op thread count.
    pub intra_threads: usize,
    /// Alphabet size the loaded model must have, if pinned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alphabet_size: Option<usize>,
    /// Blank index the loaded model must use, if pinned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_index: Option<usize>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_dir: "models/devanagari".to_string(),
            load_timeout_ms: 30_000,
            inference_timeout_ms: 10_000,
            intra_threads: 2,
            alphabet_size: None,
            blank_index: None,
        }
    }
}

impl ModelSettings {
    /// Resolve [`model_dir`](Self::model_dir) to an absolute path.
    pub fn resolved_model_dir(&self) -> PathBuf {
        resolve_dir(&self.model_dir, &crate::loader::home_dir())
    }
}

fn resolve_dir(raw: &str, home: &Path) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        return home.join(rest);
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(".lipi").join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_defaults() {
        let m = ModelSettings::default();
        assert_eq!(m.model_dir, "models/devanagari");
        assert_eq!(m.load_timeout_ms, 30_000);
        assert_eq!(m.inference_timeout_ms, 10_000);
        assert_eq!(m.intra_threads, 2);
        assert!(m.alphabet_size.is_none());
    }

    #[test]
    fn pinned_alphabet_parses() {
        let m: ModelSettings =
            serde_json::from_str(r#"{"alphabetSize": 72, "blankIndex": 0}"#).unwrap();
        assert_eq!(m.alphabet_size, Some(72));
        assert_eq!(m.blank_index, Some(0));
        assert_eq!(m.intra_threads, 2);
    }

    #[test]
    fn relative_dir_resolves_under_lipi_home() {
        let home = Path::new("/home/u");
        assert_eq!(
            resolve_dir("models/devanagari", home),
            PathBuf::from("/home/u/.lipi/models/devanagari")
        );
    }

    #[test]
    fn tilde_and_absolute_dirs() {
        let home = Path::new("/home/u");
        assert_eq!(
            resolve_dir("~/nets/deva", home),
            PathBuf::from("/home/u/nets/deva")
        );
        assert_eq!(resolve_dir("/opt/model", home), PathBuf::from("/opt/model"));
    }
}
