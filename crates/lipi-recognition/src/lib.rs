//! # lipi-recognition
//!
//! Offline handwriting recognition pipeline.
//!
//! - [`capture`]: pointer events to a [`StrokeSet`](lipi_core::StrokeSet)
//! - [`processor`]: strokes to a fixed-length feature sequence
//! - [`engine`]: the [`InferenceEngine`] seam (stub and ONNX Runtime)
//! - [`lifecycle`]: lazy, single-flight model loading with observable state
//! - [`decoder`]: CTC greedy and prefix beam search with post-filtering
//! - [`recognizer`]: the `recognize` entry point tying it together

#![deny(unsafe_code)]

pub mod capture;
pub mod decoder;
pub mod engine;
pub mod lifecycle;
pub mod processor;
pub mod recognizer;

pub use capture::{CaptureState, InputEvent, StrokeCapture, SurfaceTransform};
pub use decoder::{Candidate, CtcDecoder, DecodeStrategy, DecoderConfig, LabelPath, PostFilter};
pub use engine::{InferenceEngine, ModelLoader, ModelMetadata, StubEngine, StubLoader};
pub use lifecycle::{ModelExpectations, ModelHandle, ModelLease, ModelState, ModelStatus};
pub use processor::{ProcessorConfig, StrokeProcessor};
pub use recognizer::{IdentityCorrector, Recognizer, RecognizerConfig, TextCorrector};
