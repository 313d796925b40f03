//! # lipi-core
//!
//! Foundation types and errors for offline handwriting recognition.
//!
//! This crate provides the shared vocabulary the other lipi crates depend on:
//!
//! - **Strokes**: [`Point`], [`Stroke`], [`StrokeSet`] as recorded by a capture surface
//! - **Features**: [`FeatureFrame`] and the fixed-length [`FeatureSequence`] fed to the model
//! - **Labels**: [`LabelAlphabet`] with its reserved blank token
//! - **Model output**: [`ProbabilityMatrix`] (timesteps × labels)
//! - **Results**: [`DecodedResult`] with text, confidence and timing
//! - **Errors**: [`RecognitionError`] taxonomy via `thiserror`
//! - **Logging**: `tracing` subscriber bootstrap and test capture

#![deny(unsafe_code)]

pub mod alphabet;
pub mod constants;
pub mod errors;
pub mod features;
pub mod logging;
pub mod matrix;
pub mod result;
pub mod strokes;

pub use alphabet::LabelAlphabet;
pub use errors::{RecognitionError, Result, ResultExt};
pub use features::{FeatureFrame, FeatureSequence};
pub use matrix::ProbabilityMatrix;
pub use result::DecodedResult;
pub use strokes::{PenState, Point, Stroke, StrokeSet};
