//! Recognition output.

use serde::{Deserialize, Serialize};

/// Final text for one recognized stroke set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedResult {
    /// Recognized text after post-filtering (may be empty).
    pub text: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Wall-clock time spent in `recognize`, in milliseconds.
    pub timing_ms: u64,
}

impl DecodedResult {
    /// Build a result, clamping `confidence` into `[0, 1]`.
    pub fn new(text: impl Into<String>, confidence: f64, timing_ms: u64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            text: text.into(),
            confidence,
            timing_ms,
        }
    }

    /// Empty text with zero confidence.
    pub fn empty(timing_ms: u64) -> Self {
        Self::new(String::new(), 0.0, timing_ms)
    }

    /// Whether no text was recognized.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        assert!((DecodedResult::new("a", 1.7, 0).confidence - 1.0).abs() < f64::EPSILON);
        assert!(DecodedResult::new("a", -0.2, 0).confidence.abs() < f64::EPSILON);
        assert!(DecodedResult::new("a", f64::NAN, 0).confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_result() {
        let r = DecodedResult::empty(12);
        assert!(r.is_empty());
        assert_eq!(r.timing_ms, 12);
    }

    #[test]
    fn serde_camel_case() {
        let value = serde_json::to_value(DecodedResult::new("क", 0.9, 4)).unwrap();
        assert_eq!(value["text"], "क");
        assert_eq!(value["timingMs"], 4);
        assert!(value.get("timing_ms").is_none());
    }
}
