//! Device-reported samples and their classification.

use std::fmt;

/// Identity of one live sample stream: which device, which metric, which
/// instance of that metric on the device.
///
/// The triple is unique within a vital's value set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleIdentity {
    /// Unique device identifier.
    pub device_id: String,
    pub metric_id: String,
    pub instance_id: i32,
}

impl SampleIdentity {
    pub fn new(device_id: impl Into<String>, metric_id: impl Into<String>, instance_id: i32) -> Self {
        Self {
            device_id: device_id.into(),
            metric_id: metric_id.into(),
            instance_id,
        }
    }
}

impl fmt::Display for SampleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.device_id, self.metric_id, self.instance_id)
    }
}

/// One reading delivered by the device transport.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub identity: SampleIdentity,

    /// The numeric reading.
    pub value: f64,

    /// Device timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,

    /// Handle of the underlying publication this sample came from.
    ///
    /// Two samples with the same identity but different sources are a
    /// conflict; the first source to bind wins.
    #[cfg_attr(feature = "serde", serde(default))]
    pub source: u64,
}

impl Sample {
    /// Create a sample from the default source.
    pub fn new(identity: SampleIdentity, value: f64, timestamp_ms: u64) -> Self {
        Self {
            identity,
            value,
            timestamp_ms,
            source: 0,
        }
    }

    /// Set the source handle.
    pub fn with_source(mut self, source: u64) -> Self {
        self.source = source;
        self
    }
}

/// The four classification flags derived from a reading and its thresholds.
///
/// Flags are independent: a reading can be both above the high warning
/// bound and above the critical high bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Classification {
    pub at_or_below_low: bool,
    pub at_or_above_high: bool,
    pub at_or_below_critical_low: bool,
    pub at_or_above_critical_high: bool,
}

impl Classification {
    /// No flag set.
    pub const CLEAR: Classification = Classification {
        at_or_below_low: false,
        at_or_above_high: false,
        at_or_below_critical_low: false,
        at_or_above_critical_high: false,
    };

    /// True if either warning flag is set.
    pub fn is_warning(&self) -> bool {
        self.at_or_below_low || self.at_or_above_high
    }

    /// True if either critical flag is set.
    pub fn is_critical(&self) -> bool {
        self.at_or_below_critical_low || self.at_or_above_critical_high
    }

    pub fn is_clear(&self) -> bool {
        !self.is_warning() && !self.is_critical()
    }
}
