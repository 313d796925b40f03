//! # lipi
//!
//! Command-line front end: inspect features, decode saved model output and
//! run recognition on recorded strokes.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lipi_core::{LabelAlphabet, ProbabilityMatrix, StrokeSet};
use lipi_recognition::engine::{ModelManifest, ModelPaths};
use lipi_recognition::{
    CtcDecoder, DecoderConfig, ModelLoader, ProcessorConfig, Recognizer, RecognizerConfig,
    StrokeProcessor,
};
use lipi_settings::LipiSettings;
use serde_json::json;

/// Offline handwriting recognition.
#[derive(Parser, Debug)]
#[command(name = "lipi", version, about = "Offline handwriting recognition")]
struct Cli {
    /// Settings file (defaults to `~/.lipi/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level filter; overrides settings. `RUST_LOG` still wins.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the feature sequence for a stroke file.
    Features {
        /// JSON array of strokes, each an array of `{x, y, timestamp}` points.
        strokes: PathBuf,
    },
    /// Decode a saved probability matrix.
    Decode {
        /// JSON array of rows, one probability per label.
        matrix: PathBuf,
        /// Alphabet file, one symbol per line.
        #[arg(long)]
        alphabet: PathBuf,
        /// Index of the blank label.
        #[arg(long, default_value_t = 0)]
        blank: usize,
    },
    /// Recognize a stroke file with the configured model.
    Recognize {
        /// JSON array of strokes.
        strokes: PathBuf,
        /// Model directory; overrides settings.
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
    /// Report model directory contents and, with `--load`, the loaded model.
    Status {
        /// Model directory; overrides settings.
        #[arg(long)]
        model_dir: Option<PathBuf>,
        /// Load the model and report its metadata.
        #[arg(long, default_value_t = false)]
        load: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let loaded = match &args.settings {
        Some(path) => lipi_settings::load_settings_from_path(path),
        None => lipi_settings::load_settings(),
    };
    let level = args.log_level.clone().unwrap_or_else(|| {
        loaded
            .as_ref()
            .map_or("warn", |s| s.logging.level.as_filter_str())
            .to_string()
    });
    if args.json_logs {
        lipi_core::logging::init_json_subscriber(&level);
    } else {
        lipi_core::logging::init_subscriber(&level);
    }

    let settings = loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load settings, using defaults");
        LipiSettings::default()
    });

    match args.command {
        Command::Features { strokes } => features(&settings, &strokes),
        Command::Decode {
            matrix,
            alphabet,
            blank,
        } => decode(&settings, &matrix, &alphabet, blank),
        Command::Recognize { strokes, model_dir } => {
            recognize(&settings, &strokes, model_dir).await
        }
        Command::Status { model_dir, load } => status(&settings, model_dir, load).await,
    }
}

fn features(settings: &LipiSettings, path: &Path) -> Result<()> {
    let strokes = read_strokes(path)?;
    let processor = StrokeProcessor::new(ProcessorConfig::from_settings(&settings.processing));
    let sequence = processor.process(&strokes);
    let frames = &sequence.frames()[..sequence.content_len()];
    let out = json!({
        "length": sequence.len(),
        "contentLength": frames.len(),
        "frames": frames,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn decode(settings: &LipiSettings, matrix: &Path, alphabet: &Path, blank: usize) -> Result<()> {
    let matrix = read_matrix(matrix)?;
    let content = std::fs::read_to_string(alphabet)
        .with_context(|| format!("Failed to read alphabet: {}", alphabet.display()))?;
    let alphabet = LabelAlphabet::from_text(&content, blank)?;
    let decoder = CtcDecoder::new(&DecoderConfig::from_settings(&settings.decoding));
    let best = decoder.decode(&matrix, &alphabet)?;
    println!("{}", serde_json::to_string_pretty(&best)?);
    Ok(())
}

async fn recognize(settings: &LipiSettings, path: &Path, model_dir: Option<PathBuf>) -> Result<()> {
    let strokes = read_strokes(path)?;
    let config = recognizer_config(settings, model_dir);
    let recognizer = Recognizer::new(&config, model_loader(&config)?);
    let result = recognizer.recognize(&strokes).await?;
    recognizer.shutdown();
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn status(settings: &LipiSettings, model_dir: Option<PathBuf>, load: bool) -> Result<()> {
    let config = recognizer_config(settings, model_dir);
    let paths = ModelPaths::from_dir(&config.model_dir);
    let missing: Vec<String> = paths
        .missing()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let manifest = if paths.manifest.exists() {
        Some(ModelManifest::load(&paths.manifest)?.metadata())
    } else {
        None
    };

    let model = if load {
        let recognizer = Recognizer::new(&config, model_loader(&config)?);
        if let Err(e) = recognizer.model().wait_ready().await {
            tracing::warn!(error = %e, "model load failed");
        }
        let status = recognizer.status();
        recognizer.shutdown();
        Some(status)
    } else {
        None
    };

    let out = json!({
        "modelDir": config.model_dir.display().to_string(),
        "missing": missing,
        "manifest": manifest,
        "model": model,
        "onnxRuntime": cfg!(feature = "ort"),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn recognizer_config(settings: &LipiSettings, model_dir: Option<PathBuf>) -> RecognizerConfig {
    let mut config = RecognizerConfig::from_settings(settings);
    if let Some(dir) = model_dir {
        config.model_dir = dir;
    }
    config
}

#[cfg(feature = "ort")]
fn model_loader(config: &RecognizerConfig) -> Result<Arc<dyn ModelLoader>> {
    Ok(Arc::new(lipi_recognition::engine::OnnxModelLoader::new(
        config.model_dir.clone(),
        config.intra_threads,
    )))
}

#[cfg(not(feature = "ort"))]
fn model_loader(_config: &RecognizerConfig) -> Result<Arc<dyn ModelLoader>> {
    anyhow::bail!("lipi was built without ONNX Runtime; rebuild with `--features ort`")
}

fn read_strokes(path: &Path) -> Result<StrokeSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read strokes: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid stroke file: {}", path.display()))
}

fn read_matrix(path: &Path) -> Result<ProbabilityMatrix> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read matrix: {}", path.display()))?;
    let rows: Vec<Vec<f32>> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid matrix file: {}", path.display()))?;
    Ok(ProbabilityMatrix::from_rows(&rows)?)
}
