//! Recognition error taxonomy.
//!
//! Every failure on the capture → process → infer → decode path is reported
//! as a [`RecognitionError`]. Callers distinguish "the model never became
//! available" ([`RecognitionError::ModelUnavailable`]) from "this particular
//! call failed" ([`RecognitionError::Inference`]).

use thiserror::Error;

/// Errors that can occur during recognition.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Stroke input is empty or degenerate. Resolved locally by the
    /// recognizer, which returns an empty result instead of calling the model.
    #[error("input error: {0}")]
    Input(String),

    /// The model never finished loading, failed to load, or was released.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The inference call failed or timed out.
    #[error("inference error: {0}")]
    Inference(String),

    /// Decoding produced no viable hypothesis.
    #[error("decode error: {0}")]
    Decode(String),

    /// The loaded artifact does not match the configured pipeline
    /// (alphabet size, feature width, sequence length).
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (model or stroke file read).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for recognition operations.
pub type Result<T> = std::result::Result<T, RecognitionError>;

/// Extension trait to reduce `.map_err()` boilerplate when wrapping errors into [`RecognitionError`].
pub trait ResultExt<T> {
    /// Wrap the error as [`RecognitionError::Inference`] with `context` prefix.
    fn inference(self, context: &str) -> Result<T>;
    /// Wrap the error as [`RecognitionError::ModelUnavailable`] with `context` prefix.
    fn model(self, context: &str) -> Result<T>;
    /// Wrap the error as [`RecognitionError::Config`] with `context` prefix.
    fn config(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn inference(self, context: &str) -> Result<T> {
        self.map_err(|e| RecognitionError::Inference(format!("{context}: {e}")))
    }
    fn model(self, context: &str) -> Result<T> {
        self.map_err(|e| RecognitionError::ModelUnavailable(format!("{context}: {e}")))
    }
    fn config(self, context: &str) -> Result<T> {
        self.map_err(|e| RecognitionError::Config(format!("{context}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn error_display_variants() {
        let cases = vec![
            (
                RecognitionError::Input("no strokes".into()),
                "input error: no strokes",
            ),
            (
                RecognitionError::ModelUnavailable("load timed out".into()),
                "model unavailable: load timed out",
            ),
            (
                RecognitionError::Inference("session run".into()),
                "inference error: session run",
            ),
            (
                RecognitionError::Decode("no timesteps".into()),
                "decode error: no timesteps",
            ),
            (
                RecognitionError::Config("alphabet mismatch".into()),
                "configuration error: alphabet mismatch",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RecognitionError>();
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RecognitionError = io_err.into();
        assert_matches!(err, RecognitionError::Io(_));
    }

    #[test]
    fn result_ext_inference_context() {
        let err: std::result::Result<(), &str> = Err("onnx failure");
        let mapped = err.inference("session run");
        assert_matches!(mapped, Err(RecognitionError::Inference(s)) if s == "session run: onnx failure");
    }

    #[test]
    fn result_ext_model_context() {
        let err: std::result::Result<(), &str> = Err("missing file");
        let mapped = err.model("load manifest");
        assert_matches!(mapped, Err(RecognitionError::ModelUnavailable(s)) if s == "load manifest: missing file");
    }

    #[test]
    fn result_ext_config_context() {
        let err: std::result::Result<(), &str> = Err("bad");
        assert_matches!(err.config("alphabet"), Err(RecognitionError::Config(s)) if s == "alphabet: bad");
    }

    #[test]
    fn result_ext_ok_passthrough() {
        let ok: std::result::Result<i32, &str> = Ok(42);
        assert_eq!(ok.inference("ctx").unwrap(), 42);
        let ok: std::result::Result<i32, &str> = Ok(7);
        assert_eq!(ok.model("ctx").unwrap(), 7);
    }
}
