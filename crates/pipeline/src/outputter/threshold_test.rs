//! Tests for the threshold outputter

use std::collections::HashSet;
use std::sync::Arc;

use live_frame::{Field, Frame, Labels, Value};
use live_routing::Params;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::PipelineError;
use crate::storage::{FrameKey, FrameStorage};
use crate::template::ChannelTemplate;

fn host(name: &str) -> Labels {
    Labels::from([("host".to_string(), name.to_string())])
}

fn frame(values: &[(&str, f64)]) -> Frame {
    let fields = values
        .iter()
        .map(|(h, v)| Field::float64("value", vec![*v]).with_labels(host(h)))
        .collect();
    Frame::from_fields("cpu", fields).unwrap()
}

fn outputter(storage: &Arc<FrameStorage>) -> ThresholdOutputter {
    ThresholdOutputter::new(
        "threshold#0/value",
        "value",
        100.0,
        30.0,
        ChannelTemplate::parse("stream/alerts/{frame}").unwrap(),
        Arc::clone(storage),
    )
}

async fn run(output: &ThresholdOutputter, input: &Frame) -> Vec<ChannelFrame> {
    let params = Params::default();
    let cancel = CancellationToken::new();
    let ctx = ChannelContext {
        org_id: 1,
        channel: "stream/metrics/cpu",
        params: &params,
        cancel: &cancel,
    };
    output.output(&ctx, input).await.unwrap()
}

fn loaded(event: &ChannelFrame) -> i64 {
    match event.frame.field("loaded").and_then(|f| f.get(0)) {
        Some(Value::Int64(v)) => *v,
        other => panic!("unexpected loaded value: {other:?}"),
    }
}

// =============================================================================
// Hysteresis
// =============================================================================

#[test]
fn test_hysteresis() {
    // Not loaded: compared against the loading threshold.
    assert!(evaluate_hysteresis(false, 101.0, 100.0, 30.0));
    assert!(!evaluate_hysteresis(false, 99.0, 100.0, 30.0));
    assert!(!evaluate_hysteresis(false, 100.0, 100.0, 30.0));

    // Loaded: compared against the unloading threshold.
    assert!(evaluate_hysteresis(true, 31.0, 100.0, 30.0));
    assert!(!evaluate_hysteresis(true, 29.0, 100.0, 30.0));
    assert!(!evaluate_hysteresis(true, 30.0, 100.0, 30.0));
}

#[test]
fn test_transitions_without_state_report_everything() {
    let mut state = ThresholdState::default();
    let transitions = evaluate_transitions(&mut state, &[(1, 150.0), (2, 50.0)], 100.0, 30.0);
    assert_eq!(state.loaded, HashSet::from([1]));
    assert_eq!(state.seen, HashSet::from([1, 2]));
    assert_eq!(
        transitions,
        vec![
            Transition { index: 0, loaded: true },
            Transition { index: 1, loaded: false },
        ]
    );
}

#[test]
fn test_transitions_report_changes_only() {
    let mut state = ThresholdState {
        loaded: HashSet::from([1, 3]),
        seen: HashSet::from([1, 2, 3]),
    };
    let transitions = evaluate_transitions(&mut state, &[(1, 31.0), (2, 101.0)], 100.0, 30.0);

    // 1 stays loaded at 31, 2 loads, 3 is absent and keeps its state.
    assert_eq!(state.loaded, HashSet::from([1, 2, 3]));
    assert_eq!(transitions, vec![Transition { index: 1, loaded: true }]);
}

#[test]
fn test_transitions_report_new_dimension_below_loading() {
    let mut state = ThresholdState {
        loaded: HashSet::from([1]),
        seen: HashSet::from([1]),
    };
    let transitions = evaluate_transitions(&mut state, &[(1, 150.0), (2, 99.0)], 100.0, 30.0);

    assert_eq!(transitions, vec![Transition { index: 1, loaded: false }]);
    assert_eq!(state.seen, HashSet::from([1, 2]));
    assert_eq!(state.loaded, HashSet::from([1]));
}

// =============================================================================
// Outputter
// =============================================================================

#[tokio::test]
async fn test_first_frame_reports_each_dimension() {
    let storage = Arc::new(FrameStorage::new());
    let output = outputter(&storage);

    let events = run(&output, &frame(&[("a", 101.0), ("b", 99.0)])).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].channel, "stream/alerts/cpu");
    assert_eq!(loaded(&events[0]), 1);
    assert_eq!(loaded(&events[1]), 0);
    assert_eq!(events[0].frame.field("value").unwrap().labels(), &host("a"));
    assert_eq!(events[1].frame.field("value").unwrap().latest_f64(), Some(99.0));
}

#[tokio::test]
async fn test_loaded_dimension_uses_unload_threshold() {
    let storage = Arc::new(FrameStorage::new());
    let output = outputter(&storage);

    run(&output, &frame(&[("a", 150.0)])).await;
    assert!(run(&output, &frame(&[("a", 31.0)])).await.is_empty());

    let events = run(&output, &frame(&[("a", 29.0)])).await;
    assert_eq!(events.len(), 1);
    assert_eq!(loaded(&events[0]), 0);

    // Unloaded again: 50 is below the loading threshold.
    assert!(run(&output, &frame(&[("a", 50.0)])).await.is_empty());
}

#[tokio::test]
async fn test_dimension_appearing_later_is_reported() {
    let storage = Arc::new(FrameStorage::new());
    let output = outputter(&storage);
    run(&output, &frame(&[("a", 150.0)])).await;

    let events = run(&output, &frame(&[("a", 150.0), ("b", 99.0)])).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].frame.field("value").unwrap().labels(), &host("b"));
    assert_eq!(loaded(&events[0]), 0);

    assert!(run(&output, &frame(&[("a", 150.0), ("b", 99.0)])).await.is_empty());
}

#[tokio::test]
async fn test_state_is_stored_as_fingerprints() {
    let storage = Arc::new(FrameStorage::new());
    let output = outputter(&storage);
    run(&output, &frame(&[("a", 150.0), ("b", 10.0)])).await;

    let fingerprints = |part: &str| {
        let key = FrameKey::new(1, "stream/metrics/cpu", format!("threshold#0/value/{part}"));
        live_frame::fingerprints_from_frame(&storage.get(&key).unwrap()).unwrap()
    };
    let a = live_frame::dimension_fingerprint("value", &host("a"));
    let b = live_frame::dimension_fingerprint("value", &host("b"));
    assert_eq!(fingerprints("loaded"), HashSet::from([a]));
    assert_eq!(fingerprints("seen"), HashSet::from([a, b]));
}

#[tokio::test]
async fn test_frame_without_field_is_ignored() {
    let storage = Arc::new(FrameStorage::new());
    let output = outputter(&storage);
    let other = Frame::from_field("cpu", Field::float64("idle", vec![500.0]));

    assert!(run(&output, &other).await.is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_corrupt_state_is_an_error() {
    let storage = Arc::new(FrameStorage::new());
    let key = FrameKey::new(1, "stream/metrics/cpu", "threshold#0/value/loaded");
    storage.set(&key, Frame::from_field("x", Field::float64("fingerprint", vec![1.0])));

    let output = outputter(&storage);
    let params = Params::default();
    let cancel = CancellationToken::new();
    let ctx = ChannelContext {
        org_id: 1,
        channel: "stream/metrics/cpu",
        params: &params,
        cancel: &cancel,
    };
    let err = output.output(&ctx, &frame(&[("a", 150.0)])).await.unwrap_err();
    assert!(matches!(err, PipelineError::Frame(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crossing_fires_once() {
    let storage = Arc::new(FrameStorage::new());
    let output = Arc::new(outputter(&storage));
    run(&output, &frame(&[("a", 10.0)])).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let output = Arc::clone(&output);
        handles.push(tokio::spawn(async move {
            run(&output, &frame(&[("a", 150.0)])).await.len()
        }));
    }

    let mut fired = 0;
    for handle in handles {
        fired += handle.await.unwrap();
    }
    assert_eq!(fired, 1);
}
