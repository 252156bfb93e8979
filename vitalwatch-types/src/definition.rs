//! Vital definitions - the clinician-configured side of a monitored parameter.

/// Safety thresholds applied to every sample bound to a vital.
///
/// Each bound is optional. An unset bound is disabled: the comparison it
/// guards never fires.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Thresholds {
    /// Readings at or below this value raise a low warning.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub warning_low: Option<f64>,

    /// Readings at or above this value raise a high warning.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub warning_high: Option<f64>,

    /// Readings at or below this value are a critical low breach.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub critical_low: Option<f64>,

    /// Readings at or above this value are a critical high breach.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub critical_high: Option<f64>,

    /// Exempt zero readings from every comparison.
    ///
    /// Some devices report zero while a probe is disconnected.
    pub ignore_zero: bool,
}

impl Thresholds {
    /// Create a threshold set with every bound disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both warning bounds.
    pub fn warning(mut self, low: f64, high: f64) -> Self {
        self.warning_low = Some(low);
        self.warning_high = Some(high);
        self
    }

    /// Set both critical bounds.
    pub fn critical(mut self, low: f64, high: f64) -> Self {
        self.critical_low = Some(low);
        self.critical_high = Some(high);
        self
    }

    /// Exempt zero readings from classification.
    pub fn ignoring_zero(mut self) -> Self {
        self.ignore_zero = true;
        self
    }

    /// True if no bound is configured.
    pub fn is_disabled(&self) -> bool {
        self.warning_low.is_none()
            && self.warning_high.is_none()
            && self.critical_low.is_none()
            && self.critical_high.is_none()
    }
}

/// Definition of one monitored physiologic parameter (e.g. heart rate).
///
/// A definition is the input from which the engine builds a live vital.
/// `minimum`/`maximum`, the staleness thresholds and `color` are carried for
/// display collaborators and play no part in classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VitalDefinition {
    /// Display label, used in advisory and interlock text.
    pub label: String,

    /// Unit string appended to readings in advisory text.
    pub unit: String,

    /// Metric identifiers this vital subscribes to.
    ///
    /// Order is preserved; duplicates are dropped by the builder.
    pub metric_ids: Vec<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub thresholds: Thresholds,

    /// Lower display clamp.
    #[cfg_attr(feature = "serde", serde(default))]
    pub minimum: f64,

    /// Upper display clamp.
    #[cfg_attr(feature = "serde", serde(default))]
    pub maximum: f64,

    /// Milliseconds since the last sample before a staleness warning.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub value_ms_warning_low: Option<u64>,

    /// Milliseconds since the last sample before a staleness alarm.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub value_ms_warning_high: Option<u64>,

    /// Raise a warning while no sample is bound to this vital.
    #[cfg_attr(feature = "serde", serde(default))]
    pub no_value_warning: bool,

    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub color: Option<String>,
}

impl VitalDefinition {
    /// Create a builder for a vital definition.
    pub fn builder(label: impl Into<String>, unit: impl Into<String>) -> VitalDefinitionBuilder {
        VitalDefinitionBuilder::new(label, unit)
    }

    /// Check whether samples with this metric id feed this vital.
    pub fn subscribes_to(&self, metric_id: &str) -> bool {
        self.metric_ids.iter().any(|m| m == metric_id)
    }
}

/// Builder for `VitalDefinition`.
#[derive(Debug)]
pub struct VitalDefinitionBuilder {
    definition: VitalDefinition,
}

impl VitalDefinitionBuilder {
    /// Create a new builder with no metrics and all thresholds disabled.
    pub fn new(label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            definition: VitalDefinition {
                label: label.into(),
                unit: unit.into(),
                metric_ids: Vec::new(),
                thresholds: Thresholds::default(),
                minimum: 0.0,
                maximum: 0.0,
                value_ms_warning_low: None,
                value_ms_warning_high: None,
                no_value_warning: false,
                color: None,
            },
        }
    }

    /// Subscribe to a metric id.
    pub fn metric(mut self, metric_id: impl Into<String>) -> Self {
        let metric_id = metric_id.into();
        if !self.definition.metric_ids.contains(&metric_id) {
            self.definition.metric_ids.push(metric_id);
        }
        self
    }

    /// Subscribe to several metric ids.
    pub fn metrics<I, S>(self, metric_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        metric_ids.into_iter().fold(self, |b, m| b.metric(m))
    }

    /// Replace the whole threshold set.
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.definition.thresholds = thresholds;
        self
    }

    /// Set both warning bounds.
    pub fn warning(mut self, low: f64, high: f64) -> Self {
        self.definition.thresholds = self.definition.thresholds.warning(low, high);
        self
    }

    /// Set both critical bounds.
    pub fn critical(mut self, low: f64, high: f64) -> Self {
        self.definition.thresholds = self.definition.thresholds.critical(low, high);
        self
    }

    pub fn ignore_zero(mut self, ignore: bool) -> Self {
        self.definition.thresholds.ignore_zero = ignore;
        self
    }

    pub fn no_value_warning(mut self, warn: bool) -> Self {
        self.definition.no_value_warning = warn;
        self
    }

    /// Set the display clamp bounds.
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.definition.minimum = minimum;
        self.definition.maximum = maximum;
        self
    }

    /// Set the staleness thresholds in milliseconds.
    pub fn staleness(mut self, warning_low_ms: u64, warning_high_ms: u64) -> Self {
        self.definition.value_ms_warning_low = Some(warning_low_ms);
        self.definition.value_ms_warning_high = Some(warning_high_ms);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.definition.color = Some(color.into());
        self
    }

    /// Build the definition.
    pub fn build(self) -> VitalDefinition {
        self.definition
    }
}
