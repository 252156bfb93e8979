//! Vitals and the live values bound to them.

use std::fmt;

use tracing::{debug, warn};
use vitalwatch_types::{Classification, Sample, SampleIdentity, Thresholds, VitalDefinition};

use crate::classify::classify;
use crate::confinement::Confinement;

/// Stable identifier of a vital within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VitalId(u64);

impl VitalId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vital-{}", self.0)
    }
}

/// One device-reported sample bound to a vital.
///
/// The classification is kept consistent with the latest reading and the
/// owning vital's thresholds; it is recomputed before any mutation returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    identity: SampleIdentity,
    source: u64,
    reading: f64,
    timestamp_ms: u64,
    classification: Classification,
    vital: VitalId,
}

impl Value {
    fn new(sample: &Sample, vital: VitalId, thresholds: &Thresholds) -> Self {
        Self {
            identity: sample.identity.clone(),
            source: sample.source,
            reading: sample.value,
            timestamp_ms: sample.timestamp_ms,
            classification: classify(sample.value, thresholds),
            vital,
        }
    }

    pub fn identity(&self) -> &SampleIdentity {
        &self.identity
    }

    /// Handle of the publication this value is bound to.
    pub fn source(&self) -> u64 {
        self.source
    }

    /// Latest numeric reading.
    pub fn reading(&self) -> f64 {
        self.reading
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// The vital that owns this value. Never changes.
    pub fn vital(&self) -> VitalId {
        self.vital
    }

    pub fn at_or_below_low(&self) -> bool {
        self.classification.at_or_below_low
    }

    pub fn at_or_above_high(&self) -> bool {
        self.classification.at_or_above_high
    }

    pub fn at_or_below_critical_low(&self) -> bool {
        self.classification.at_or_below_critical_low
    }

    pub fn at_or_above_critical_high(&self) -> bool {
        self.classification.at_or_above_critical_high
    }

    fn reclassify(&mut self, thresholds: &Thresholds) {
        self.classification = classify(self.reading, thresholds);
    }
}

/// Result of binding a sample to a vital.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// A new value was appended.
    Inserted,
    /// An existing value from the same source took the new reading.
    Updated,
    /// A value with this identity is bound to a different source. Nothing changed.
    Conflict,
}

impl AttachOutcome {
    /// True if the vital's values changed.
    pub fn is_change(&self) -> bool {
        !matches!(self, AttachOutcome::Conflict)
    }
}

/// A monitored physiologic parameter and its live values.
///
/// Values are kept in insertion order, which is also the order they are
/// evaluated and reported in.
#[derive(Debug)]
pub struct Vital {
    id: VitalId,
    definition: VitalDefinition,
    values: Vec<Value>,
    confinement: Confinement,
}

impl Vital {
    /// Create a vital owned by the calling thread.
    pub fn new(id: VitalId, definition: VitalDefinition) -> Self {
        Self {
            id,
            definition,
            values: Vec::new(),
            confinement: Confinement::current(),
        }
    }

    pub fn id(&self) -> VitalId {
        self.id
    }

    pub fn definition(&self) -> &VitalDefinition {
        &self.definition
    }

    pub fn label(&self) -> &str {
        &self.definition.label
    }

    pub fn unit(&self) -> &str {
        &self.definition.unit
    }

    pub fn metric_ids(&self) -> &[String] {
        &self.definition.metric_ids
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.definition.thresholds
    }

    pub fn minimum(&self) -> f64 {
        self.definition.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.definition.maximum
    }

    pub fn value_ms_warning_low(&self) -> Option<u64> {
        self.definition.value_ms_warning_low
    }

    pub fn value_ms_warning_high(&self) -> Option<u64> {
        self.definition.value_ms_warning_high
    }

    pub fn no_value_warning(&self) -> bool {
        self.definition.no_value_warning
    }

    pub fn color(&self) -> Option<&str> {
        self.definition.color.as_deref()
    }

    /// Check whether samples with this metric id feed this vital.
    pub fn subscribes_to(&self, metric_id: &str) -> bool {
        self.definition.subscribes_to(metric_id)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate over values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Look up a value by identity.
    pub fn value(&self, identity: &SampleIdentity) -> Option<&Value> {
        self.values.iter().find(|v| &v.identity == identity)
    }

    /// Bind a sample to this vital.
    ///
    /// An existing value with the same identity takes the new reading if it
    /// comes from the same source. A different source is a conflict: it is
    /// logged and the existing value is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the one that created the vital.
    pub fn attach(&mut self, sample: &Sample) -> AttachOutcome {
        self.confinement.assert_current("Vital::attach");

        let thresholds = self.definition.thresholds;
        if let Some(existing) = self.values.iter_mut().find(|v| v.identity == sample.identity) {
            if existing.source != sample.source {
                warn!(
                    vital = %self.definition.label,
                    identity = %sample.identity,
                    bound_source = existing.source,
                    rejected_source = sample.source,
                    "duplicate sample identity from a different source, keeping the first"
                );
                return AttachOutcome::Conflict;
            }
            existing.reading = sample.value;
            existing.timestamp_ms = sample.timestamp_ms;
            existing.reclassify(&thresholds);
            return AttachOutcome::Updated;
        }

        self.values.push(Value::new(sample, self.id, &thresholds));
        AttachOutcome::Inserted
    }

    /// Remove the value with this identity.
    ///
    /// Returns false if no such value was bound.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the one that created the vital.
    pub fn detach(&mut self, identity: &SampleIdentity) -> bool {
        self.confinement.assert_current("Vital::detach");

        match self.values.iter().position(|v| &v.identity == identity) {
            Some(index) => {
                self.values.remove(index);
                true
            }
            None => {
                debug!(vital = %self.definition.label, %identity, "detach of unbound identity ignored");
                false
            }
        }
    }

    /// Replace the threshold set and reclassify every bound value.
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the one that created the vital.
    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.confinement.assert_current("Vital::set_thresholds");

        self.definition.thresholds = thresholds;
        for value in &mut self.values {
            value.reclassify(&thresholds);
        }
    }

    /// Release every value. Returns how many were bound.
    pub(crate) fn destroy(mut self) -> usize {
        self.confinement.assert_current("Vital::destroy");
        let released = self.values.len();
        self.values.clear();
        debug!(vital = %self.definition.label, released, "vital destroyed");
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hr_vital() -> Vital {
        let def = VitalDefinition::builder("HR", "bpm")
            .metric("MDC_ECG_HEART_RATE")
            .warning(60.0, 100.0)
            .critical(40.0, 150.0)
            .build();
        Vital::new(VitalId::new(1), def)
    }

    fn sample(device: &str, instance: i32, value: f64) -> Sample {
        Sample::new(
            SampleIdentity::new(device, "MDC_ECG_HEART_RATE", instance),
            value,
            1_703_160_000_000,
        )
    }

    #[test]
    fn attach_inserts_in_order() {
        let mut vital = hr_vital();
        assert!(vital.is_empty());

        assert_eq!(vital.attach(&sample("b", 0, 70.0)), AttachOutcome::Inserted);
        assert_eq!(vital.attach(&sample("a", 0, 80.0)), AttachOutcome::Inserted);
        assert_eq!(vital.attach(&sample("a", 1, 90.0)), AttachOutcome::Inserted);

        let devices: Vec<_> = vital
            .values()
            .map(|v| (v.identity().device_id.as_str(), v.identity().instance_id))
            .collect();
        assert_eq!(devices, vec![("b", 0), ("a", 0), ("a", 1)]);
        assert!(vital.values().all(|v| v.vital() == VitalId::new(1)));
    }

    #[test]
    fn attach_same_source_updates_in_place() {
        let mut vital = hr_vital();
        vital.attach(&sample("a", 0, 70.0));

        let mut update = sample("a", 0, 55.0);
        update.timestamp_ms += 1_000;
        assert_eq!(vital.attach(&update), AttachOutcome::Updated);

        assert_eq!(vital.len(), 1);
        let value = vital.value(&update.identity).unwrap();
        assert_eq!(value.reading(), 55.0);
        assert_eq!(value.timestamp_ms(), 1_703_160_001_000);
        assert!(value.at_or_below_low());
    }

    #[test]
    fn attach_conflicting_source_keeps_first() {
        let mut vital = hr_vital();
        vital.attach(&sample("a", 0, 70.0).with_source(7));

        let outcome = vital.attach(&sample("a", 0, 30.0).with_source(8));
        assert_eq!(outcome, AttachOutcome::Conflict);
        assert!(!outcome.is_change());

        let value = vital.value(&SampleIdentity::new("a", "MDC_ECG_HEART_RATE", 0)).unwrap();
        assert_eq!(value.reading(), 70.0);
        assert_eq!(value.source(), 7);
        assert!(value.classification().is_clear());
    }

    #[test]
    fn detach_unknown_is_noop() {
        let mut vital = hr_vital();
        vital.attach(&sample("a", 0, 70.0));

        assert!(!vital.detach(&SampleIdentity::new("zzz", "MDC_ECG_HEART_RATE", 0)));
        assert_eq!(vital.len(), 1);

        assert!(vital.detach(&SampleIdentity::new("a", "MDC_ECG_HEART_RATE", 0)));
        assert!(vital.is_empty());
        assert!(!vital.detach(&SampleIdentity::new("a", "MDC_ECG_HEART_RATE", 0)));
    }

    #[test]
    fn net_count_matches_attaches_minus_detaches() {
        let mut vital = hr_vital();
        let mut expected = 0usize;

        for i in 0..20 {
            vital.attach(&sample("dev", i, 70.0));
            expected += 1;
            if i % 3 == 0 {
                vital.detach(&SampleIdentity::new("dev", "MDC_ECG_HEART_RATE", i / 2));
                expected -= 1;
            }
            assert_eq!(vital.len(), expected);
        }
    }

    #[test]
    fn set_thresholds_reclassifies_immediately() {
        let mut vital = hr_vital();
        vital.attach(&sample("a", 0, 105.0));
        vital.attach(&sample("b", 0, 72.0));
        assert!(vital.values().next().unwrap().at_or_above_high());

        vital.set_thresholds(Thresholds::new().warning(70.0, 120.0).critical(30.0, 180.0));

        let flags: Vec<_> = vital.values().map(|v| v.classification()).collect();
        assert!(flags[0].is_clear());
        assert!(flags[1].is_clear());

        vital.set_thresholds(Thresholds::new().warning(75.0, 120.0));
        assert!(vital.values().nth(1).unwrap().at_or_below_low());
        assert_eq!(vital.thresholds().warning_low, Some(75.0));
    }

    #[test]
    fn destroy_releases_all_values() {
        let mut vital = hr_vital();
        vital.attach(&sample("a", 0, 70.0));
        vital.attach(&sample("b", 0, 70.0));

        assert_eq!(vital.destroy(), 2);
    }

    #[test]
    fn attach_from_another_thread_panics() {
        let vital = hr_vital();
        let result = std::thread::spawn(move || {
            let mut vital = vital;
            vital.attach(&sample("a", 0, 70.0));
        })
        .join();

        assert!(result.is_err());
    }
}
