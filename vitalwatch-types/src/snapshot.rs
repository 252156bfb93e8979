//! Aggregate alarm state published after every evaluation.

use std::fmt;

/// System-wide alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlarmState {
    #[default]
    Normal,
    Warning,
    Alarm,
}

impl AlarmState {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            AlarmState::Normal => "OK",
            AlarmState::Warning => "WARN",
            AlarmState::Alarm => "ALARM",
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlarmState::Normal => "Normal",
            AlarmState::Warning => "Warning",
            AlarmState::Alarm => "Alarm",
        };
        f.write_str(name)
    }
}

/// What a single advisory line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdvisoryKind {
    /// A vital that requires a source has none bound.
    NoSource,
    /// A reading at or below its low bound.
    Low,
    /// A reading at or above its high bound.
    High,
}

/// One human-readable warning-level condition.
///
/// Renders as the line shown to clinicians, e.g. `- low HR 55 bpm` or
/// `- no source of SpO2`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Advisory {
    pub kind: AdvisoryKind,
    /// Label of the vital the advisory is about.
    pub label: String,
    /// The offending reading. `None` for `NoSource`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub value: Option<f64>,
    pub unit: String,
}

impl Advisory {
    pub fn no_source(label: impl Into<String>) -> Self {
        Self {
            kind: AdvisoryKind::NoSource,
            label: label.into(),
            value: None,
            unit: String::new(),
        }
    }

    pub fn low(label: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            kind: AdvisoryKind::Low,
            label: label.into(),
            value: Some(value),
            unit: unit.into(),
        }
    }

    pub fn high(label: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            kind: AdvisoryKind::High,
            label: label.into(),
            value: Some(value),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.kind {
            AdvisoryKind::NoSource => return write!(f, "- no source of {}", self.label),
            AdvisoryKind::Low => "low",
            AdvisoryKind::High => "high",
        };
        write!(f, "- {} {}", direction, self.label)?;
        if let Some(value) = self.value {
            write!(f, " {}", value)?;
        }
        if !self.unit.is_empty() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

/// Point-in-time view of the safety interlock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterlockStatus {
    /// True while the dependent device is halted.
    pub latched: bool,
    /// Reason the interlock tripped; empty while released.
    pub message: String,
}

/// The aggregate state produced by one evaluation pass.
///
/// Snapshots are immutable once published. Consumers receive a fresh
/// snapshot after every mutation of the engine.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlarmSnapshot {
    pub state: AlarmState,

    /// Advisories in evaluation order.
    pub advisories: Vec<Advisory>,

    /// Newline-joined advisories followed by an `at HH:MM:SS` line.
    /// Empty when there is nothing to report.
    pub advisory_text: String,

    /// Number of warning-level conditions counted in the pass.
    pub warning_count: u32,

    pub interlock: InterlockStatus,

    /// Wall-clock time of the evaluation in milliseconds since the Unix epoch.
    pub evaluated_at_ms: u64,
}

impl AlarmSnapshot {
    /// Check if the engine is in the alarm state.
    pub fn is_alarm(&self) -> bool {
        self.state == AlarmState::Alarm
    }

    /// Check if the dependent device has been halted.
    pub fn is_halted(&self) -> bool {
        self.interlock.latched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_state_orders_by_severity() {
        assert!(AlarmState::Normal < AlarmState::Warning);
        assert!(AlarmState::Warning < AlarmState::Alarm);
        assert_eq!(AlarmState::default(), AlarmState::Normal);
        assert_eq!(AlarmState::Alarm.symbol(), "ALARM");
    }

    #[test]
    fn advisory_lines() {
        assert_eq!(Advisory::low("HR", 55.0, "bpm").to_string(), "- low HR 55 bpm");
        assert_eq!(Advisory::high("Temp", 38.6, "C").to_string(), "- high Temp 38.6 C");
        assert_eq!(Advisory::no_source("SpO2").to_string(), "- no source of SpO2");
    }

    #[test]
    fn advisory_without_unit_has_no_trailing_space() {
        assert_eq!(Advisory::low("EtCO2", 20.0, "").to_string(), "- low EtCO2 20");
    }

    #[test]
    fn default_snapshot_is_quiet() {
        let snapshot = AlarmSnapshot::default();
        assert_eq!(snapshot.state, AlarmState::Normal);
        assert!(snapshot.advisory_text.is_empty());
        assert!(!snapshot.is_alarm());
        assert!(!snapshot.is_halted());
        assert!(snapshot.interlock.message.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = AlarmSnapshot {
            state: AlarmState::Alarm,
            advisories: vec![Advisory::low("HR", 35.0, "bpm")],
            advisory_text: "- low HR 35 bpm\nat 14:05:09".to_string(),
            warning_count: 1,
            interlock: InterlockStatus {
                latched: true,
                message: "Pump Stopped".to_string(),
            },
            evaluated_at_ms: 1703160000000,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: AlarmSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, parsed);
    }
}
