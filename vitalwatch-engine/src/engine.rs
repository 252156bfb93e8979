//! The alarm engine: owns the vitals, aggregates their classifications, and
//! drives the interlock.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use vitalwatch_types::{
    Advisory, AlarmSnapshot, AlarmState, InterlockStatus, Sample, SampleIdentity, Thresholds,
    VitalDefinition,
};

use crate::clock::{Clock, SystemClock};
use crate::confinement::Confinement;
use crate::error::EngineError;
use crate::interlock::Interlock;
use crate::notifier::{ChangeNotifier, ObserverId};
use crate::settings::{EngineSettings, DEFAULT_ALARM_COUNT_THRESHOLD};
use crate::vital::{Vital, VitalId};

const INTERLOCK_HEADER: &str = "Pump Stopped";
const INTERLOCK_FOOTER: &str = "nurse alerted";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Aggregates vital classifications into a system alarm state.
///
/// Every mutator runs one full evaluation pass before it returns and then
/// publishes the resulting snapshot through the [`ChangeNotifier`]. The
/// evaluation is a pure function of the current vitals, except for the
/// interlock, which stays latched until [`AlarmEngine::reset_interlock`].
///
/// The engine is confined to the thread that built it. Calling a mutator
/// from any other thread panics before any state changes; use
/// [`ModelContext`](crate::ModelContext) to feed an engine from elsewhere.
///
/// # Example
///
/// ```rust
/// use vitalwatch_engine::AlarmEngine;
/// use vitalwatch_types::{AlarmState, Sample, SampleIdentity, VitalDefinition};
///
/// let mut engine = AlarmEngine::new();
/// engine.add_vital(
///     VitalDefinition::builder("HR", "bpm")
///         .metric("MDC_ECG_HEART_RATE")
///         .warning(60.0, 100.0)
///         .critical(40.0, 150.0)
///         .build(),
/// );
///
/// let id = SampleIdentity::new("monitor-01", "MDC_ECG_HEART_RATE", 0);
/// engine.ingest_sample(Sample::new(id, 35.0, 0));
///
/// assert_eq!(engine.state(), AlarmState::Alarm);
/// assert!(engine.is_halted());
/// assert!(engine.interlock().message.contains("low HR 35"));
/// ```
#[derive(Debug)]
pub struct AlarmEngine {
    vitals: Vec<Vital>,
    next_vital_id: u64,
    /// Last upsert per identity, replayed into vitals added later.
    live: Vec<Sample>,
    alarm_count_threshold: u32,
    interlock: Interlock,
    notifier: ChangeNotifier,
    clock: Arc<dyn Clock>,
    snapshot: Arc<AlarmSnapshot>,
    confinement: Confinement,
}

impl AlarmEngine {
    /// Create an engine with default settings, confined to the calling thread.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AlarmEngineBuilder {
        AlarmEngineBuilder::new()
    }

    /// Create an engine and add every configured vital.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::builder().settings(settings).build()
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Add a vital at the end of the evaluation order.
    ///
    /// Live samples for any of its metrics are bound immediately.
    pub fn add_vital(&mut self, definition: VitalDefinition) -> VitalId {
        self.confinement.assert_current("AlarmEngine::add_vital");
        let id = self.insert_vital(definition);
        self.recompute();
        id
    }

    /// Remove a vital and release its values.
    ///
    /// Returns false, without re-evaluating, if the vital does not exist.
    pub fn remove_vital(&mut self, id: VitalId) -> bool {
        self.confinement.assert_current("AlarmEngine::remove_vital");
        let Some(index) = self.vitals.iter().position(|v| v.id() == id) else {
            debug!(vital = %id, "remove of unknown vital ignored");
            return false;
        };
        self.vitals.remove(index).destroy();
        self.recompute();
        true
    }

    /// Replace a vital's thresholds and reclassify its values.
    pub fn set_thresholds(&mut self, id: VitalId, thresholds: Thresholds) -> Result<(), EngineError> {
        self.confinement.assert_current("AlarmEngine::set_thresholds");
        let vital = self
            .vitals
            .iter_mut()
            .find(|v| v.id() == id)
            .ok_or(EngineError::UnknownVital(id))?;
        vital.set_thresholds(thresholds);
        self.recompute();
        Ok(())
    }

    /// Bind a sample to every vital subscribed to its metric.
    ///
    /// Evaluates once after all bindings. Returns the number of vitals whose
    /// values changed.
    pub fn ingest_sample(&mut self, sample: Sample) -> usize {
        self.confinement.assert_current("AlarmEngine::ingest_sample");

        let changed = self
            .vitals
            .iter_mut()
            .filter(|v| v.subscribes_to(&sample.identity.metric_id))
            .map(|v| v.attach(&sample))
            .filter(|outcome| outcome.is_change())
            .count();

        match self.live.iter_mut().find(|s| s.identity == sample.identity) {
            Some(existing) if existing.source == sample.source => *existing = sample,
            Some(_) => {}
            None => self.live.push(sample),
        }

        self.recompute();
        changed
    }

    /// Unbind a sample from every vital subscribed to its metric.
    ///
    /// Evaluates once after all removals. Returns the number of vitals that
    /// held the sample.
    pub fn retract_sample(&mut self, identity: &SampleIdentity) -> usize {
        self.confinement.assert_current("AlarmEngine::retract_sample");

        let removed = self
            .vitals
            .iter_mut()
            .filter(|v| v.subscribes_to(&identity.metric_id))
            .map(|v| v.detach(identity))
            .filter(|&detached| detached)
            .count();
        self.live.retain(|s| &s.identity != identity);

        self.recompute();
        removed
    }

    /// Set how many simultaneous warnings escalate to an alarm.
    pub fn set_alarm_count_threshold(&mut self, threshold: u32) {
        self.confinement.assert_current("AlarmEngine::set_alarm_count_threshold");
        self.alarm_count_threshold = threshold;
        self.recompute();
    }

    /// Release the interlock.
    ///
    /// Publishes a snapshot with the released interlock but does not
    /// re-evaluate: a sample that is still critical trips the interlock
    /// again on the next mutation.
    pub fn reset_interlock(&mut self) {
        self.confinement.assert_current("AlarmEngine::reset_interlock");
        self.interlock.reset();

        let snapshot = AlarmSnapshot {
            interlock: self.interlock.status(),
            ..(*self.snapshot).clone()
        };
        self.publish(snapshot);
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register a callback run after every evaluation.
    pub fn on_change<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&AlarmSnapshot) + Send + Sync + 'static,
    {
        self.notifier.on_change(callback)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.notifier.remove(id)
    }

    /// Subscribe to published snapshots from any thread or task.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AlarmSnapshot>> {
        self.notifier.subscribe()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The snapshot produced by the last evaluation.
    pub fn snapshot(&self) -> Arc<AlarmSnapshot> {
        self.snapshot.clone()
    }

    pub fn state(&self) -> AlarmState {
        self.snapshot.state
    }

    pub fn advisory_text(&self) -> &str {
        &self.snapshot.advisory_text
    }

    pub fn interlock(&self) -> InterlockStatus {
        self.interlock.status()
    }

    /// True while the dependent device is halted.
    pub fn is_halted(&self) -> bool {
        self.interlock.is_latched()
    }

    pub fn alarm_count_threshold(&self) -> u32 {
        self.alarm_count_threshold
    }

    /// Iterate over vitals in evaluation order.
    pub fn vitals(&self) -> impl Iterator<Item = &Vital> {
        self.vitals.iter()
    }

    pub fn vital(&self, id: VitalId) -> Option<&Vital> {
        self.vitals.iter().find(|v| v.id() == id)
    }

    /// Number of live samples known to the engine.
    pub fn live_sample_count(&self) -> usize {
        self.live.len()
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    fn insert_vital(&mut self, definition: VitalDefinition) -> VitalId {
        let id = VitalId::new(self.next_vital_id);
        self.next_vital_id += 1;

        let mut vital = Vital::new(id, definition);
        for sample in &self.live {
            if vital.subscribes_to(&sample.identity.metric_id) {
                vital.attach(sample);
            }
        }
        debug!(vital = %id, label = vital.label(), bound = vital.len(), "vital added");
        self.vitals.push(vital);
        id
    }

    fn recompute(&mut self) {
        let now = self.clock.now();
        let time = now.format(TIME_FORMAT).to_string();

        let advisories = self.collect_advisories();
        let warning_count = u32::try_from(advisories.len()).unwrap_or(u32::MAX);

        let (mut state, advisory_text) = if warning_count > 0 {
            let lines: Vec<String> = advisories.iter().map(ToString::to_string).collect();
            (AlarmState::Warning, format!("{}\nat {}", lines.join("\n"), time))
        } else {
            (AlarmState::Normal, String::new())
        };

        // The warning count is checked before any critical breach, so a count
        // escalation suppresses the more specific critical message.
        if warning_count >= self.alarm_count_threshold {
            state = AlarmState::Alarm;
            self.interlock.trip(format!(
                "{}\n{}\n{}",
                INTERLOCK_HEADER, advisory_text, INTERLOCK_FOOTER
            ));
        } else if let Some(breach) = self.first_critical_breach() {
            state = AlarmState::Alarm;
            self.interlock.trip(format!(
                "{}\n{}\nat {}\n{}",
                INTERLOCK_HEADER, breach, time, INTERLOCK_FOOTER
            ));
        }

        debug!(%state, warning_count, halted = self.interlock.is_latched(), "alarm state evaluated");

        self.publish(AlarmSnapshot {
            state,
            advisories,
            advisory_text,
            warning_count,
            interlock: self.interlock.status(),
            // Clocks before the Unix epoch report 0.
            evaluated_at_ms: u64::try_from(now.timestamp_millis()).unwrap_or(0),
        });
    }

    fn collect_advisories(&self) -> Vec<Advisory> {
        let mut advisories = Vec::new();
        for vital in &self.vitals {
            if vital.no_value_warning() && vital.is_empty() {
                advisories.push(Advisory::no_source(vital.label()));
                continue;
            }
            for value in vital.values() {
                if value.at_or_below_low() {
                    advisories.push(Advisory::low(vital.label(), value.reading(), vital.unit()));
                }
                if value.at_or_above_high() {
                    advisories.push(Advisory::high(vital.label(), value.reading(), vital.unit()));
                }
            }
        }
        advisories
    }

    /// The first value, in evaluation order, past a critical bound.
    fn first_critical_breach(&self) -> Option<Advisory> {
        self.vitals.iter().find_map(|vital| {
            vital.values().find_map(|value| {
                if value.at_or_below_critical_low() {
                    Some(Advisory::low(vital.label(), value.reading(), vital.unit()))
                } else if value.at_or_above_critical_high() {
                    Some(Advisory::high(vital.label(), value.reading(), vital.unit()))
                } else {
                    None
                }
            })
        })
    }

    fn publish(&mut self, snapshot: AlarmSnapshot) {
        self.snapshot = Arc::new(snapshot);
        self.notifier.publish(self.snapshot.clone());
    }
}

impl Default for AlarmEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring an [`AlarmEngine`].
#[derive(Debug, Default)]
pub struct AlarmEngineBuilder {
    alarm_count_threshold: Option<u32>,
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<ChangeNotifier>,
    vitals: Vec<VitalDefinition>,
}

impl AlarmEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many simultaneous warnings escalate to an alarm.
    ///
    /// Defaults to 2.
    pub fn alarm_count_threshold(mut self, threshold: u32) -> Self {
        self.alarm_count_threshold = Some(threshold);
        self
    }

    /// Set the clock used for advisory timestamps. Defaults to local time.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Publish through an existing notifier.
    ///
    /// Useful when observers must be registered before the engine exists.
    pub fn notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Add a vital to create at build time.
    pub fn vital(mut self, definition: VitalDefinition) -> Self {
        self.vitals.push(definition);
        self
    }

    /// Apply settings: alarm-count threshold and vitals.
    pub fn settings(mut self, settings: &EngineSettings) -> Self {
        self.alarm_count_threshold = Some(settings.alarm_count_threshold);
        self.vitals.extend(settings.vitals.iter().cloned());
        self
    }

    /// Build the engine, confined to the calling thread.
    ///
    /// If vitals were configured, one evaluation runs and is published.
    pub fn build(self) -> AlarmEngine {
        let mut engine = AlarmEngine {
            vitals: Vec::new(),
            next_vital_id: 0,
            live: Vec::new(),
            alarm_count_threshold: self
                .alarm_count_threshold
                .unwrap_or(DEFAULT_ALARM_COUNT_THRESHOLD),
            interlock: Interlock::default(),
            notifier: self.notifier.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            snapshot: Arc::new(AlarmSnapshot::default()),
            confinement: Confinement::current(),
        };

        if !self.vitals.is_empty() {
            for definition in self.vitals {
                engine.insert_vital(definition);
            }
            engine.recompute();
        }
        engine
    }
}
