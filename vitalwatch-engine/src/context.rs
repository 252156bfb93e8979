//! A dedicated model context that owns an engine.
//!
//! Samples usually arrive on transport threads or async tasks. The engine is
//! confined to one thread, so those producers marshal their events through a
//! [`ModelHandle`] onto the context thread, which applies them in order.
//!
//! ```text
//! transport tasks ──▶ ModelHandle ──mpsc──▶ model thread (AlarmEngine)
//!                                                  │
//!                      watch::Receiver ◀───────────┘ ChangeNotifier
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use vitalwatch_types::{AlarmSnapshot, Sample, SampleIdentity, Thresholds, VitalDefinition};

use crate::engine::{AlarmEngine, AlarmEngineBuilder};
use crate::error::EngineError;
use crate::notifier::{ChangeNotifier, ObserverId};
use crate::settings::EngineSettings;
use crate::vital::VitalId;

const THREAD_NAME: &str = "vitalwatch-model";

#[derive(Debug)]
enum Command {
    AddVital {
        definition: VitalDefinition,
        reply: oneshot::Sender<VitalId>,
    },
    RemoveVital(VitalId),
    SetThresholds(VitalId, Thresholds),
    Ingest(Sample),
    Retract(SampleIdentity),
    SetAlarmCountThreshold(u32),
    ResetInterlock,
    Shutdown,
}

/// Spawns model context threads.
#[derive(Debug)]
pub struct ModelContext;

impl ModelContext {
    /// Start a model context running an engine built from `builder`.
    ///
    /// The engine is built on the context thread so that it is confined
    /// there. Any notifier set on the builder is replaced by the one shared
    /// with the returned handle.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vitalwatch_engine::{AlarmEngine, ModelContext};
    /// use vitalwatch_types::{Sample, SampleIdentity, VitalDefinition};
    ///
    /// let hr = VitalDefinition::builder("HR", "bpm").metric("MDC_ECG_HEART_RATE").build();
    /// let (handle, thread) = ModelContext::spawn(AlarmEngine::builder().vital(hr)).unwrap();
    ///
    /// let id = SampleIdentity::new("monitor-01", "MDC_ECG_HEART_RATE", 0);
    /// handle.ingest(Sample::new(id, 72.0, 0)).unwrap();
    ///
    /// handle.shutdown().unwrap();
    /// thread.join().unwrap();
    /// ```
    pub fn spawn(builder: AlarmEngineBuilder) -> Result<(ModelHandle, ModelThread), EngineError> {
        let notifier = ChangeNotifier::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let engine_notifier = notifier.clone();
        let join = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(builder.notifier(engine_notifier), rx))?;

        Ok((ModelHandle { tx, notifier }, ModelThread { join }))
    }

    /// Start a model context configured from settings.
    pub fn from_settings(settings: &EngineSettings) -> Result<(ModelHandle, ModelThread), EngineError> {
        Self::spawn(AlarmEngine::builder().settings(settings))
    }
}

fn run(builder: AlarmEngineBuilder, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut engine = builder.build();
    info!(vitals = engine.vitals().count(), "model context started");

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::AddVital { definition, reply } => {
                let id = engine.add_vital(definition);
                // The requester may have given up waiting; the vital stays.
                let _ = reply.send(id);
            }
            Command::RemoveVital(id) => {
                engine.remove_vital(id);
            }
            Command::SetThresholds(id, thresholds) => {
                if let Err(err) = engine.set_thresholds(id, thresholds) {
                    warn!(%err, "threshold update dropped");
                }
            }
            Command::Ingest(sample) => {
                engine.ingest_sample(sample);
            }
            Command::Retract(identity) => {
                engine.retract_sample(&identity);
            }
            Command::SetAlarmCountThreshold(threshold) => {
                engine.set_alarm_count_threshold(threshold);
            }
            Command::ResetInterlock => engine.reset_interlock(),
            Command::Shutdown => {
                debug!("model context shutdown requested");
                break;
            }
        }
    }

    info!("model context stopped");
}

/// A cloneable, thread-safe handle for feeding a model context.
///
/// Commands are applied in the order they are sent. Dropping every handle
/// stops the context.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    tx: mpsc::UnboundedSender<Command>,
    notifier: ChangeNotifier,
}

impl ModelHandle {
    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx.send(command).map_err(|_| EngineError::ContextClosed)
    }

    /// Add a vital and wait for its id.
    pub async fn add_vital(&self, definition: VitalDefinition) -> Result<VitalId, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::AddVital { definition, reply })?;
        rx.await.map_err(|_| EngineError::ContextClosed)
    }

    pub fn remove_vital(&self, id: VitalId) -> Result<(), EngineError> {
        self.send(Command::RemoveVital(id))
    }

    /// Replace a vital's thresholds. Updates for unknown vitals are logged and dropped.
    pub fn set_thresholds(&self, id: VitalId, thresholds: Thresholds) -> Result<(), EngineError> {
        self.send(Command::SetThresholds(id, thresholds))
    }

    /// Queue an upsert of a sample.
    pub fn ingest(&self, sample: Sample) -> Result<(), EngineError> {
        self.send(Command::Ingest(sample))
    }

    /// Queue a retraction of a sample.
    pub fn retract(&self, identity: SampleIdentity) -> Result<(), EngineError> {
        self.send(Command::Retract(identity))
    }

    pub fn set_alarm_count_threshold(&self, threshold: u32) -> Result<(), EngineError> {
        self.send(Command::SetAlarmCountThreshold(threshold))
    }

    pub fn reset_interlock(&self) -> Result<(), EngineError> {
        self.send(Command::ResetInterlock)
    }

    /// Ask the context to stop after the commands already queued.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.send(Command::Shutdown)
    }

    /// Check if the context has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AlarmSnapshot>> {
        self.notifier.subscribe()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Arc<AlarmSnapshot> {
        self.notifier.latest()
    }

    /// Register a callback run on the model thread after every evaluation.
    pub fn on_change<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&AlarmSnapshot) + Send + Sync + 'static,
    {
        self.notifier.on_change(callback)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.notifier.remove(id)
    }
}

/// The model context thread.
#[derive(Debug)]
pub struct ModelThread {
    join: JoinHandle<()>,
}

impl ModelThread {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the context to stop.
    pub fn join(self) -> Result<(), EngineError> {
        self.join.join().map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            EngineError::ContextPanicked(reason)
        })
    }
}
