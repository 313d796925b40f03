//! Model lifecycle.
//!
//! ```text
//! Uninitialized → Loading → Ready ⇄ Recognizing
//!                    ↓
//!                  Failed            (terminal)
//! any → Released                      (after shutdown, terminal)
//! ```
//!
//! A [`ModelHandle`] is constructed once and shared. The first caller that
//! needs the model starts the load in a background task; every caller,
//! including later ones, awaits that same task.
//! A failed or timed-out load is remembered and every later caller fails
//! fast with [`RecognitionError::ModelUnavailable`].

use std::sync::Arc;
use std::time::Duration;

use lipi_core::constants::{DEFAULT_MAX_SEQ_LENGTH, FEATURE_WIDTH};
use lipi_core::{RecognitionError, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::engine::{InferenceEngine, ModelLoader, ModelMetadata};

/// Default bound on a model load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of the shared model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelState {
    /// Nobody has asked for the model yet.
    Uninitialized,
    /// Load in progress.
    Loading,
    /// Loaded and idle.
    Ready,
    /// At least one recognition is running.
    Recognizing,
    /// Load failed or timed out.
    Failed,
    /// Released by `shutdown()`.
    Released,
}

impl ModelState {
    /// Whether the state can never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Released)
    }
}

/// What a loaded model must match before it is accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelExpectations {
    /// Values per input frame.
    pub feature_width: usize,
    /// Input sequence length produced by the processor.
    pub max_seq_length: usize,
    /// Alphabet size the decoder is configured for, if pinned.
    pub alphabet_size: Option<usize>,
    /// Blank index the decoder is configured for, if pinned.
    pub blank_index: Option<usize>,
}

impl Default for ModelExpectations {
    fn default() -> Self {
        Self {
            feature_width: FEATURE_WIDTH,
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
            alphabet_size: None,
            blank_index: None,
        }
    }
}

impl ModelExpectations {
    /// Reject an engine whose contract differs.
    pub fn check(&self, engine: &dyn InferenceEngine) -> Result<()> {
        let meta = engine.metadata();
        let alphabet = engine.alphabet();
        let mismatch = |what: &str, model: usize, configured: usize| -> Result<()> {
            Err(RecognitionError::Config(format!(
                "model {what} is {model} but the pipeline is configured for {configured}"
            )))
        };

        if meta.feature_width != self.feature_width {
            return mismatch("feature width", meta.feature_width, self.feature_width);
        }
        if meta.max_seq_length != self.max_seq_length {
            return mismatch("sequence length", meta.max_seq_length, self.max_seq_length);
        }
        if let Some(labels) = meta.output_labels {
            if labels != alphabet.len() {
                return Err(RecognitionError::Config(format!(
                    "model has {labels} output labels but its alphabet has {} symbols",
                    alphabet.len()
                )));
            }
        }
        if let Some(size) = self.alphabet_size {
            if alphabet.len() != size {
                return mismatch("alphabet size", alphabet.len(), size);
            }
        }
        if let Some(blank) = self.blank_index {
            if alphabet.blank_index() != blank {
                return mismatch("blank index", alphabet.blank_index(), blank);
            }
        }
        Ok(())
    }
}

/// Serializable snapshot of the handle.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    /// Current state.
    pub state: ModelState,
    /// Loaded model identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelMetadata>,
    /// Loaded alphabet size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alphabet_size: Option<usize>,
    /// Recognitions currently running.
    pub in_flight: usize,
    /// Why the load failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

type LoadOutcome = std::result::Result<(), String>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// State shared between the handle and its background load task.
struct Inner {
    loader: Arc<dyn ModelLoader>,
    expectations: ModelExpectations,
    load_timeout: Duration,
    engine: RwLock<Option<Arc<dyn InferenceEngine>>>,
    in_flight: Mutex<usize>,
    last_error: Mutex<Option<String>>,
    state: watch::Sender<ModelState>,
}

impl Inner {
    fn state(&self) -> ModelState {
        *self.state.borrow()
    }

    async fn load(&self) -> LoadOutcome {
        info!(timeout = ?self.load_timeout, "loading model");

        let loaded = match tokio::time::timeout(self.load_timeout, self.loader.load()).await {
            Ok(Ok(engine)) => self.expectations.check(engine.as_ref()).map(|()| engine),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RecognitionError::ModelUnavailable(format!(
                "model load timed out after {}ms",
                self.load_timeout.as_millis()
            ))),
        };

        let _count = self.in_flight.lock();
        if self.state() != ModelState::Loading {
            debug!(state = ?self.state(), "discarding load result");
            return Err(released_message());
        }
        match loaded {
            Ok(engine) => {
                let meta = engine.metadata();
                info!(
                    name = %meta.name,
                    version = %meta.version,
                    alphabet_size = engine.alphabet().len(),
                    "model ready"
                );
                *self.engine.write() = Some(engine);
                let _ = self.state.send_replace(ModelState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "model load failed");
                let message = match e {
                    RecognitionError::ModelUnavailable(message) => message,
                    other => other.to_string(),
                };
                *self.last_error.lock() = Some(message.clone());
                let _ = self.state.send_replace(ModelState::Failed);
                Err(message)
            }
        }
    }
}

/// Shared, lazily loaded model with an observable lifecycle.
///
/// The load runs in its own task, so a caller that stops waiting does not
/// abandon it; later callers join the same load.
pub struct ModelHandle {
    inner: Arc<Inner>,
    load: Mutex<Option<SharedLoad>>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("state", &self.state())
            .field("expectations", &self.inner.expectations)
            .field("load_timeout", &self.inner.load_timeout)
            .finish_non_exhaustive()
    }
}

impl ModelHandle {
    /// Create an unloaded handle.
    pub fn new(
        loader: Arc<dyn ModelLoader>,
        expectations: ModelExpectations,
        load_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ModelState::Uninitialized);
        Self {
            inner: Arc::new(Inner {
                loader,
                expectations,
                load_timeout,
                engine: RwLock::new(None),
                in_flight: Mutex::new(0),
                last_error: Mutex::new(None),
                state,
            }),
            load: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> ModelState {
        self.inner.state()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ModelState> {
        self.inner.state.subscribe()
    }

    /// Start loading in the background.
    pub fn preload(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let handle = Arc::clone(self);
        tokio::spawn(async move { handle.wait_ready().await })
    }

    /// Resolve once the model is loaded, loading it if nobody has yet.
    pub async fn wait_ready(&self) -> Result<()> {
        self.engine().await.map(|_| ())
    }

    /// The loaded engine, loading it if needed.
    pub async fn engine(&self) -> Result<Arc<dyn InferenceEngine>> {
        if self.state() == ModelState::Released {
            return Err(released());
        }
        let load = self
            .load
            .lock()
            .get_or_insert_with(|| self.start_load())
            .clone();
        load.await.map_err(RecognitionError::ModelUnavailable)?;
        self.inner.engine.read().clone().ok_or_else(released)
    }

    fn start_load(&self) -> SharedLoad {
        {
            let _count = self.inner.in_flight.lock();
            if self.state() == ModelState::Uninitialized {
                let _ = self.inner.state.send_replace(ModelState::Loading);
            }
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.load().await })
            .map(|joined| joined.unwrap_or_else(|e| Err(format!("model load task failed: {e}"))))
            .boxed()
            .shared()
    }

    /// Load the engine and mark the handle as recognizing until the lease drops.
    pub async fn acquire(&self) -> Result<ModelLease<'_>> {
        let engine = self.engine().await?;
        let mut count = self.inner.in_flight.lock();
        if self.state().is_terminal() {
            return Err(released());
        }
        *count += 1;
        let _ = self.inner.state.send_replace(ModelState::Recognizing);
        Ok(ModelLease {
            handle: self,
            engine,
        })
    }

    fn release_lease(&self) {
        let mut count = self.inner.in_flight.lock();
        *count = count.saturating_sub(1);
        if *count == 0 && self.state() == ModelState::Recognizing {
            let _ = self.inner.state.send_replace(ModelState::Ready);
        }
    }

    /// Drop the engine. In-flight leases finish on their own engine handle;
    /// every later call fails with `ModelUnavailable`. A load still running
    /// is discarded when it completes.
    pub fn shutdown(&self) {
        let _count = self.inner.in_flight.lock();
        *self.inner.engine.write() = None;
        let previous = self.inner.state.send_replace(ModelState::Released);
        if previous != ModelState::Released {
            info!(?previous, "model released");
        }
    }

    /// Snapshot for status reporting.
    pub fn status(&self) -> ModelStatus {
        let engine = self.inner.engine.read().clone();
        ModelStatus {
            state: self.state(),
            model: engine.as_ref().map(|e| e.metadata().clone()),
            alphabet_size: engine.as_ref().map(|e| e.alphabet().len()),
            in_flight: *self.inner.in_flight.lock(),
            last_error: self.inner.last_error.lock().clone(),
        }
    }
}

fn released_message() -> String {
    "model has been released".to_string()
}

fn released() -> RecognitionError {
    RecognitionError::ModelUnavailable(released_message())
}

/// Access to the engine for one recognition.
///
/// While any lease is alive the handle reports [`ModelState::Recognizing`].
pub struct ModelLease<'a> {
    handle: &'a ModelHandle,
    engine: Arc<dyn InferenceEngine>,
}

impl ModelLease<'_> {
    /// The engine.
    pub fn engine(&self) -> &dyn InferenceEngine {
        self.engine.as_ref()
    }
}

impl Drop for ModelLease<'_> {
    fn drop(&mut self) {
        self.handle.release_lease();
    }
}
