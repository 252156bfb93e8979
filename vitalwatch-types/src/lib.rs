//! # vitalwatch-types
//!
//! Core types for vital sign alarm monitoring. This crate defines the data
//! exchanged between the alarm engine and its collaborators: the device
//! transport that delivers samples, the configuration layer that supplies
//! vital definitions, and whatever displays the aggregate alarm state.
//!
//! ## Features
//!
//! - `serde`: serialization derives for every public type
//!
//! ## Example
//!
//! ```rust
//! use vitalwatch_types::{Sample, SampleIdentity, Thresholds, VitalDefinition};
//!
//! let hr = VitalDefinition::builder("HR", "bpm")
//!     .metric("MDC_PULS_OXIM_PULS_RATE")
//!     .metric("MDC_ECG_HEART_RATE")
//!     .warning(60.0, 100.0)
//!     .critical(40.0, 150.0)
//!     .range(0.0, 250.0)
//!     .build();
//!
//! assert!(hr.subscribes_to("MDC_ECG_HEART_RATE"));
//! assert_eq!(hr.thresholds, Thresholds::new().warning(60.0, 100.0).critical(40.0, 150.0));
//!
//! let sample = Sample::new(
//!     SampleIdentity::new("monitor-01", "MDC_ECG_HEART_RATE", 0),
//!     72.0,
//!     1_703_160_000_000,
//! );
//! assert_eq!(sample.identity.metric_id, "MDC_ECG_HEART_RATE");
//! ```

mod definition;
mod sample;
mod snapshot;

pub use definition::*;
pub use sample::*;
pub use snapshot::*;
