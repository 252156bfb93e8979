//! # vitalwatch-engine
//!
//! The vital sign alarm engine. It classifies physiologic samples streamed
//! from medical devices against clinician-configured thresholds, aggregates
//! the classifications into a system alarm state, and drives a sticky safety
//! interlock that halts a dependent device (e.g. an infusion pump).
//!
//! ## Quick Start
//!
//! ```rust
//! use vitalwatch_engine::AlarmEngine;
//! use vitalwatch_types::{AlarmState, Sample, SampleIdentity, VitalDefinition};
//!
//! let mut engine = AlarmEngine::new();
//! engine.add_vital(
//!     VitalDefinition::builder("SpO2", "%")
//!         .metric("MDC_PULS_OXIM_SAT_O2")
//!         .warning(92.0, 101.0)
//!         .critical(85.0, 105.0)
//!         .build(),
//! );
//!
//! engine.on_change(|snapshot| println!("{}: {}", snapshot.state, snapshot.advisory_text));
//!
//! let id = SampleIdentity::new("oximeter-3", "MDC_PULS_OXIM_SAT_O2", 0);
//! engine.ingest_sample(Sample::new(id.clone(), 91.0, 0));
//! assert_eq!(engine.state(), AlarmState::Warning);
//!
//! engine.retract_sample(&id);
//! assert_eq!(engine.state(), AlarmState::Normal);
//! ```
//!
//! ## Evaluation
//!
//! Every mutation runs one synchronous pass over all vitals:
//!
//! 1. Count warnings: a vital with `no_value_warning` and no values, and
//!    every value at or past a warning bound.
//! 2. Any warning puts the system in `Warning` with joined advisory text.
//! 3. A warning count at or above the alarm-count threshold escalates to
//!    `Alarm` and trips the interlock with the advisory text.
//! 4. Otherwise the first value past a critical bound escalates to `Alarm`
//!    and trips the interlock naming that value.
//! 5. The snapshot is published to observers.
//!
//! ## Threading
//!
//! An engine is confined to the thread that built it; mutators panic when
//! called from anywhere else. [`ModelContext`] runs an engine on its own
//! thread and hands out a cloneable [`ModelHandle`] that any thread or async
//! task can use to feed it.

mod classify;
mod clock;
mod confinement;
mod context;
mod engine;
mod error;
mod interlock;
mod notifier;
mod settings;
mod vital;

pub use classify::classify;
pub use clock::{Clock, FixedClock, SystemClock};
pub use confinement::Confinement;
pub use context::{ModelContext, ModelHandle, ModelThread};
pub use engine::{AlarmEngine, AlarmEngineBuilder};
pub use error::EngineError;
pub use interlock::{Interlock, DEFAULT_INTERLOCK_MESSAGE};
pub use notifier::{ChangeNotifier, ObserverId};
pub use settings::{EngineSettings, DEFAULT_ALARM_COUNT_THRESHOLD, ENV_PREFIX};
pub use vital::{AttachOutcome, Value, Vital, VitalId};

// Re-export types for convenience
pub use vitalwatch_types::{
    Advisory, AdvisoryKind, AlarmSnapshot, AlarmState, Classification, InterlockStatus, Sample,
    SampleIdentity, Thresholds, VitalDefinition,
};
