//! Package-level constants.

/// Current version of lipi (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "lipi";

/// Values per feature frame: `dx`, `dy`, pen state.
pub const FEATURE_WIDTH: usize = 3;

/// Default fixed length of a [`FeatureSequence`](crate::FeatureSequence).
pub const DEFAULT_MAX_SEQ_LENGTH: usize = 256;

/// Default minimum path distance between resampled points, in surface units.
pub const DEFAULT_RESAMPLE_DISTANCE: f64 = 3.0;

/// Default number of hypotheses kept by beam search.
pub const DEFAULT_BEAM_WIDTH: usize = 10;

/// Default confidence below which the next decoding strategy is tried.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION must be semver (MAJOR.MINOR.PATCH)");
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn name_is_lowercase() {
        assert_eq!(NAME, NAME.to_lowercase());
    }

    #[test]
    fn defaults_are_sane() {
        assert_eq!(FEATURE_WIDTH, 3);
        assert_eq!(DEFAULT_MAX_SEQ_LENGTH, 256);
        assert!(DEFAULT_RESAMPLE_DISTANCE > 0.0);
        assert!(DEFAULT_BEAM_WIDTH > 0);
        assert!((0.0..=1.0).contains(&DEFAULT_CONFIDENCE_THRESHOLD));
    }
}
