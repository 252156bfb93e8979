//! End-to-end alarm scenarios against the public engine API.

use std::sync::Arc;

use chrono::DateTime;
use parking_lot::Mutex;
use vitalwatch_engine::{
    AlarmEngine, AlarmState, Clock, FixedClock, Sample, SampleIdentity, VitalDefinition,
};

const HR: &str = "MDC_ECG_HEART_RATE";
const SPO2: &str = "MDC_PULS_OXIM_SAT_O2";
const RR: &str = "MDC_CO2_RESP_RATE";

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(
        DateTime::parse_from_rfc3339("2024-03-01T08:30:00+00:00").unwrap(),
    ))
}

fn engine() -> AlarmEngine {
    AlarmEngine::builder().clock(clock()).build()
}

fn hr() -> VitalDefinition {
    VitalDefinition::builder("HR", "bpm")
        .metric(HR)
        .warning(60.0, 100.0)
        .critical(40.0, 150.0)
        .build()
}

fn spo2() -> VitalDefinition {
    VitalDefinition::builder("SpO2", "%")
        .metric(SPO2)
        .warning(92.0, 101.0)
        .critical(85.0, 105.0)
        .build()
}

fn identity(device: &str, metric: &str) -> SampleIdentity {
    SampleIdentity::new(device, metric, 0)
}

fn sample(device: &str, metric: &str, value: f64) -> Sample {
    Sample::new(identity(device, metric), value, 0)
}

#[test]
fn single_critical_low_trips_interlock() {
    let mut engine = engine();
    engine.add_vital(hr());

    engine.ingest_sample(sample("monitor-01", HR, 35.0));

    assert_eq!(engine.state(), AlarmState::Alarm);
    let interlock = engine.interlock();
    assert!(interlock.latched);
    assert!(interlock.message.contains("low HR 35"));
    assert_eq!(
        interlock.message,
        "Pump Stopped\n- low HR 35 bpm\nat 08:30:00\nnurse alerted"
    );
}

#[test]
fn two_warnings_reach_count_threshold() {
    let mut engine = engine();
    engine.add_vital(hr());
    engine.add_vital(spo2());

    engine.ingest_sample(sample("monitor-01", HR, 58.0));
    assert_eq!(engine.state(), AlarmState::Warning);
    assert!(!engine.is_halted());

    engine.ingest_sample(sample("oximeter-3", SPO2, 91.0));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, AlarmState::Alarm);
    assert_eq!(snapshot.warning_count, 2);
    assert_eq!(
        snapshot.advisory_text,
        "- low HR 58 bpm\n- low SpO2 91 %\nat 08:30:00"
    );
    assert_eq!(
        snapshot.interlock.message,
        format!("Pump Stopped\n{}\nnurse alerted", snapshot.advisory_text)
    );
}

#[test]
fn missing_source_counts_as_warning() {
    let mut engine = engine();
    engine.add_vital(
        VitalDefinition::builder("RR", "bpm")
            .metric(RR)
            .warning(8.0, 30.0)
            .no_value_warning(true)
            .build(),
    );

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, AlarmState::Warning);
    assert_eq!(snapshot.warning_count, 1);
    assert!(snapshot.advisory_text.contains("no source of RR"));

    // A missing source plus a warning on another vital escalates
    engine.add_vital(hr());
    engine.ingest_sample(sample("monitor-01", HR, 110.0));
    assert_eq!(engine.snapshot().warning_count, 2);
    assert_eq!(engine.state(), AlarmState::Alarm);

    // A bound value clears the missing-source advisory
    engine.ingest_sample(sample("capno-1", RR, 14.0));
    assert_eq!(engine.snapshot().warning_count, 1);
    assert!(!engine.advisory_text().contains("no source"));
}

#[test]
fn reset_releases_until_next_evaluation() {
    let mut engine = engine();
    engine.add_vital(hr());
    engine.ingest_sample(sample("monitor-01", HR, 35.0));
    assert!(engine.is_halted());

    engine.reset_interlock();
    let interlock = engine.interlock();
    assert!(!interlock.latched);
    assert_eq!(interlock.message, "");

    // Still critical, so the next evaluation trips again
    engine.ingest_sample(sample("monitor-01", HR, 36.0));
    assert!(engine.is_halted());
    assert!(engine.interlock().message.contains("low HR 36"));
}

#[test]
fn count_threshold_takes_precedence_over_critical_breach() {
    let mut engine = engine();
    engine.add_vital(hr());
    engine.add_vital(spo2());

    // HR 30 is both a warning and critical; SpO2 91 is a warning
    engine.ingest_sample(sample("oximeter-3", SPO2, 91.0));
    engine.ingest_sample(sample("monitor-01", HR, 30.0));

    let message = engine.interlock().message;
    assert!(message.starts_with("Pump Stopped\n- low HR 30 bpm\n- low SpO2 91 %\n"));
    assert!(message.ends_with("\nnurse alerted"));
}

#[test]
fn latched_message_survives_recovery() {
    let mut engine = engine();
    engine.add_vital(hr());
    engine.ingest_sample(sample("monitor-01", HR, 160.0));
    let tripped = engine.interlock().message;
    assert!(tripped.contains("high HR 160"));

    for value in [155.0, 72.0, 30.0, 80.0] {
        engine.ingest_sample(sample("monitor-01", HR, value));
        assert!(engine.is_halted());
        assert_eq!(engine.interlock().message, tripped);
    }

    engine.retract_sample(&identity("monitor-01", HR));
    assert_eq!(engine.state(), AlarmState::Normal);
    assert!(engine.is_halted());
    assert_eq!(engine.snapshot().interlock.message, tripped);
}

#[test]
fn value_count_follows_distinct_identities() {
    let mut engine = AlarmEngine::builder()
        .clock(clock())
        .alarm_count_threshold(100)
        .build();
    let id = engine.add_vital(hr());

    let devices: Vec<String> = (0..8).map(|i| format!("monitor-{:02}", i)).collect();
    for device in &devices {
        engine.ingest_sample(sample(device, HR, 72.0));
    }
    // Repeated updates do not add values
    for device in &devices {
        engine.ingest_sample(sample(device, HR, 74.0));
    }
    assert_eq!(engine.vital(id).unwrap().len(), devices.len());

    for (removed, device) in devices.iter().enumerate() {
        engine.retract_sample(&identity(device, HR));
        assert_eq!(engine.vital(id).unwrap().len(), devices.len() - removed - 1);
    }
    assert!(engine.vital(id).unwrap().is_empty());
}

#[test]
fn advisory_lines_follow_vital_order() {
    let mut engine = AlarmEngine::builder()
        .clock(clock())
        .alarm_count_threshold(10)
        .build();
    engine.add_vital(spo2());
    engine.add_vital(hr());

    engine.ingest_sample(sample("monitor-01", HR, 105.0));
    engine.ingest_sample(sample("oximeter-3", SPO2, 90.0));

    assert_eq!(
        engine.advisory_text(),
        "- low SpO2 90 %\n- high HR 105 bpm\nat 08:30:00"
    );
    assert_eq!(engine.state(), AlarmState::Warning);
}

#[test]
fn ignore_zero_suppresses_disconnected_sensor() {
    let mut engine = engine();
    engine.add_vital(
        VitalDefinition::builder("SpO2", "%")
            .metric(SPO2)
            .warning(92.0, 101.0)
            .critical(85.0, 105.0)
            .ignore_zero(true)
            .build(),
    );

    engine.ingest_sample(sample("oximeter-3", SPO2, 0.0));
    assert_eq!(engine.state(), AlarmState::Normal);
    assert!(!engine.is_halted());
}

#[test]
fn observers_see_every_transition() {
    let mut engine = engine();
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = states.clone();
    engine.on_change(move |snapshot| sink.lock().push((snapshot.state, snapshot.is_halted())));

    engine.add_vital(hr());
    engine.ingest_sample(sample("monitor-01", HR, 55.0));
    engine.ingest_sample(sample("monitor-01", HR, 35.0));
    engine.reset_interlock();
    engine.retract_sample(&identity("monitor-01", HR));

    assert_eq!(
        *states.lock(),
        vec![
            (AlarmState::Normal, false),
            (AlarmState::Warning, false),
            (AlarmState::Alarm, true),
            (AlarmState::Alarm, false),
            (AlarmState::Normal, false),
        ]
    );
}

#[test]
fn published_snapshot_serializes_for_collaborators() {
    let mut engine = engine();
    engine.add_vital(hr());
    engine.ingest_sample(sample("monitor-01", HR, 35.0));

    let json = serde_json::to_value(&*engine.snapshot()).unwrap();
    assert_eq!(json["state"], "Alarm");
    assert_eq!(json["warning_count"], 1);
    assert_eq!(json["advisories"][0]["kind"], "Low");
    assert_eq!(json["advisories"][0]["label"], "HR");
    assert_eq!(json["advisories"][0]["value"], 35.0);
    assert_eq!(json["interlock"]["latched"], true);
    assert_eq!(
        json["interlock"]["message"],
        "Pump Stopped\n- low HR 35 bpm\nat 08:30:00\nnurse alerted"
    );
    assert_eq!(json["evaluated_at_ms"], 1_709_281_800_000u64);

    let decoded: vitalwatch_engine::AlarmSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, *engine.snapshot());
}
