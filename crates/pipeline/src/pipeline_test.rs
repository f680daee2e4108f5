//! End-to-end tests for dispatch, subscribe and rule management

use live_config::{
    ConverterConfig, DataOutputterConfig, OutputterConfig, ProcessorConfig, RemoteWriteBackend,
    RemoteWriteSettings, RoleCheckConfig, RuleAuthConfig, SubscriberConfig,
};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::builder::BuildContext;
use crate::rule_storage::MemoryRuleStorage;

fn editor() -> LiveContext {
    LiveContext::new(Role::Editor)
}

fn json_rule(pattern: &str) -> ChannelRuleConfig {
    ChannelRuleConfig::new(1, pattern).with_converter(ConverterConfig::of_type("jsonAuto"))
}

async fn pipeline_with(rules: Vec<ChannelRuleConfig>) -> Pipeline {
    let storage = Arc::new(MemoryRuleStorage::new());
    for rule in rules {
        storage.create_channel_rule(rule).await.unwrap();
    }
    Pipeline::new(PipelineConfig::default(), storage)
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_redirect_to_processed_channel() {
    let pipeline = pipeline_with(vec![
        json_rule("stream/raw/:device").with_output(OutputterConfig::redirect("stream/clean/{device}")),
        ChannelRuleConfig::new(1, "stream/clean/:device")
            .with_processor(ProcessorConfig::keep_fields(["time", "value"]))
            .with_output(OutputterConfig::local_subscribers()),
    ])
    .await;
    let mut rx = pipeline.hub().subscribe(1, "stream/clean/d1").unwrap();

    pipeline
        .dispatch(&editor(), 1, "stream/raw/d1", br#"{"value": 1.5, "junk": "x"}"#)
        .await
        .unwrap();

    let frame = Frame::from_json_slice(&rx.recv().await.unwrap()).unwrap();
    let names: Vec<&str> = frame.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["time", "value"]);
    assert_eq!(frame.field("value").unwrap().latest_f64(), Some(1.5));

    let metrics = pipeline.metrics().snapshot();
    assert_eq!(metrics.published, 1);
    assert_eq!(metrics.redirects, 1);
    assert_eq!(metrics.frames_output, 2);
}

#[tokio::test]
async fn test_redirect_cycle_is_bounded() {
    let pipeline = pipeline_with(vec![
        json_rule("stream/loop/a").with_output(OutputterConfig::redirect("stream/loop/b")),
        ChannelRuleConfig::new(1, "stream/loop/b").with_output(OutputterConfig::redirect("stream/loop/a")),
    ])
    .await;

    let err = pipeline
        .dispatch(&editor(), 1, "stream/loop/a", br#"{"value": 1}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::TooManyHops { limit: 8, .. }));
}

#[tokio::test]
async fn test_self_redirect_is_bounded() {
    let pipeline = pipeline_with(vec![
        json_rule("stream/loop/:x").with_output(OutputterConfig::redirect("stream/loop/{x}")),
    ])
    .await;

    let err = pipeline
        .dispatch(&editor(), 1, "stream/loop/a", br#"{"value": 1}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::TooManyHops { .. }));
}

#[tokio::test]
async fn test_redirect_limit_keeps_collected_errors() {
    let pipeline = pipeline_with(vec![
        json_rule("stream/loop/a")
            .with_output(OutputterConfig::redirect("stream/loop/b"))
            .with_output(OutputterConfig::redirect("stream/nowhere/x")),
        ChannelRuleConfig::new(1, "stream/loop/b").with_output(OutputterConfig::redirect("stream/loop/a")),
    ])
    .await;

    let err = pipeline
        .dispatch(&editor(), 1, "stream/loop/a", br#"{"value": 1}"#)
        .await
        .unwrap_err();
    let PipelineError::Multiple(errors) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(matches!(errors.last(), Some(PipelineError::TooManyHops { limit: 8, .. })));
    assert!(errors.iter().any(|e| matches!(e, PipelineError::NoRule { channel } if channel == "stream/nowhere/x")));
}

#[tokio::test]
async fn test_no_rule() {
    let pipeline = pipeline_with(vec![json_rule("stream/a/b")]).await;
    let err = pipeline.dispatch(&editor(), 1, "stream/a/c", b"{}").await.unwrap_err();
    assert!(matches!(err, PipelineError::NoRule { .. }));

    // Rules are per organization.
    let err = pipeline.dispatch(&editor(), 2, "stream/a/b", b"{}").await.unwrap_err();
    assert!(matches!(err, PipelineError::NoRule { .. }));
}

#[tokio::test]
async fn test_decode_error_rejects_payload() {
    let pipeline = pipeline_with(vec![
        json_rule("stream/a/b").with_output(OutputterConfig::managed_stream()),
    ])
    .await;

    let err = pipeline.dispatch(&editor(), 1, "stream/a/b", b"{oops").await.unwrap_err();
    assert!(matches!(err, PipelineError::Transform(_)));
    assert_eq!(pipeline.metrics().snapshot().decode_failures, 1);
    assert!(pipeline.services().streams.latest(1, "stream/a/b").is_none());
}

#[tokio::test]
async fn test_publish_requires_role() {
    let mut rule = json_rule("stream/a/b").with_output(OutputterConfig::managed_stream());
    rule.settings.auth = Some(RuleAuthConfig {
        subscribe: None,
        publish: Some(RoleCheckConfig { role: Role::Admin }),
    });
    let pipeline = pipeline_with(vec![rule]).await;

    let err = pipeline
        .dispatch(&editor(), 1, "stream/a/b", br#"{"value": 1}"#)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Forbidden {
            action: "publish",
            required: Role::Admin,
            actual: Role::Editor,
            ..
        }
    ));

    let admin = LiveContext::new(Role::Admin);
    pipeline.dispatch(&admin, 1, "stream/a/b", br#"{"value": 1}"#).await.unwrap();
}

#[tokio::test]
async fn test_viewer_cannot_publish_by_default() {
    let pipeline = pipeline_with(vec![json_rule("stream/a/b")]).await;
    let viewer = LiveContext::new(Role::Viewer);
    let err = pipeline.dispatch(&viewer, 1, "stream/a/b", b"{}").await.unwrap_err();
    assert!(matches!(err, PipelineError::Forbidden { .. }));
}

#[tokio::test]
async fn test_failing_sink_does_not_block_others() {
    let storage = Arc::new(MemoryRuleStorage::new());
    storage.put_backend(RemoteWriteBackend {
        org_id: 1,
        uid: "down".to_string(),
        settings: RemoteWriteSettings {
            endpoint: "http://127.0.0.1:1/write".to_string(),
            user: None,
            password: None,
        },
    });
    storage
        .create_channel_rule(
            json_rule("stream/a/b")
                .with_output(OutputterConfig::remote_write("down"))
                .with_output(OutputterConfig::local_subscribers()),
        )
        .await
        .unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default(), storage);
    let mut rx = pipeline.hub().subscribe(1, "stream/a/b").unwrap();

    let err = pipeline
        .dispatch(&editor(), 1, "stream/a/b", br#"{"value": 2}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::RemoteWrite { .. }));
    assert!(rx.recv().await.is_some());
    assert_eq!(pipeline.metrics().snapshot().output_failures, 1);
}

#[tokio::test]
async fn test_data_output_redirects_raw_payload() {
    let pipeline = pipeline_with(vec![
        ChannelRuleConfig::new(1, "stream/raw/:device")
            .with_data_output(DataOutputterConfig::redirect("stream/parsed/{device}")),
        json_rule("stream/parsed/:device").with_output(OutputterConfig::managed_stream()),
    ])
    .await;

    pipeline
        .dispatch(&editor(), 1, "stream/raw/d2", br#"{"value": 7}"#)
        .await
        .unwrap();

    let latest = pipeline.services().streams.latest(1, "stream/parsed/d2").unwrap();
    assert_eq!(latest.name(), "d2");
    assert_eq!(latest.field("value").unwrap().latest_f64(), Some(7.0));
}

#[tokio::test]
async fn test_builtin_data_output_accepts_frames() {
    let pipeline = pipeline_with(vec![
        ChannelRuleConfig::new(1, "stream/app/:name").with_data_output(DataOutputterConfig::of_type("builtin")),
    ])
    .await;
    let frame = Frame::from_field("", live_frame::Field::int64("count", vec![3]));

    pipeline
        .dispatch(&editor(), 1, "stream/app/jobs", &frame.to_json_bytes().unwrap())
        .await
        .unwrap();
    let latest = pipeline.services().streams.latest(1, "stream/app/jobs").unwrap();
    assert_eq!(latest.name(), "jobs");
}

#[tokio::test]
async fn test_cancelled_dispatch() {
    let pipeline = pipeline_with(vec![
        json_rule("stream/a/b").with_output(OutputterConfig::managed_stream()),
    ])
    .await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = editor().with_cancel(cancel);

    let err = pipeline.dispatch(&ctx, 1, "stream/a/b", b"{}").await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
}

// =============================================================================
// Subscribe
// =============================================================================

#[tokio::test]
async fn test_subscribe_replays_latest_frame() {
    let pipeline = pipeline_with(vec![
        json_rule("stream/a/:x")
            .with_output(OutputterConfig::managed_stream())
            .with_subscriber(SubscriberConfig::of_type("managedStream")),
        json_rule("stream/b/:x").with_output(OutputterConfig::managed_stream()),
    ])
    .await;
    let viewer = LiveContext::new(Role::Viewer);

    let empty = pipeline.on_subscribe(&viewer, 1, "stream/a/cpu").await.unwrap();
    assert!(empty.initial_data.is_none());

    pipeline.dispatch(&editor(), 1, "stream/a/cpu", br#"{"value": 4}"#).await.unwrap();
    let reply = pipeline.on_subscribe(&viewer, 1, "stream/a/cpu").await.unwrap();
    let frame = Frame::from_json_slice(&reply.initial_data.unwrap()).unwrap();
    assert_eq!(frame.field("value").unwrap().latest_f64(), Some(4.0));

    // Without subscribers the stream scope handler answers.
    pipeline.dispatch(&editor(), 1, "stream/b/mem", br#"{"value": 5}"#).await.unwrap();
    let reply = pipeline.on_subscribe(&viewer, 1, "stream/b/mem").await.unwrap();
    assert!(reply.initial_data.is_some());

    assert_eq!(pipeline.metrics().snapshot().subscribes, 3);
}

#[tokio::test]
async fn test_subscribe_refused() {
    let mut rule = json_rule("stream/private/:x");
    rule.settings.auth = Some(RuleAuthConfig {
        subscribe: Some(RoleCheckConfig { role: Role::Editor }),
        publish: None,
    });
    let pipeline = pipeline_with(vec![rule]).await;
    let viewer = LiveContext::new(Role::Viewer);

    let err = pipeline.on_subscribe(&viewer, 1, "stream/private/x").await.unwrap_err();
    assert!(matches!(err, PipelineError::Forbidden { action: "subscribe", .. }));
    let err = pipeline.on_subscribe(&viewer, 1, "stream/public/x").await.unwrap_err();
    assert!(matches!(err, PipelineError::NoRule { .. }));

    assert!(pipeline.on_subscribe(&editor(), 1, "stream/private/x").await.is_ok());
    assert_eq!(pipeline.metrics().snapshot().subscribe_failures, 2);
}

// =============================================================================
// Rule management
// =============================================================================

#[tokio::test]
async fn test_invalid_rule_is_not_stored() {
    let pipeline = pipeline_with(Vec::new()).await;
    let bogus = json_rule("stream/a/b").with_output(OutputterConfig::of_type("bogus"));

    let err = pipeline.create_channel_rule(bogus).await.unwrap_err();
    assert!(err.to_string().contains("bogus"));
    assert!(pipeline.rules(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_backend_is_not_stored() {
    let pipeline = pipeline_with(Vec::new()).await;
    let rule = json_rule("stream/a/b").with_output(OutputterConfig::remote_write("nope"));

    let err = pipeline.create_channel_rule(rule).await.unwrap_err();
    assert!(err.to_string().contains("nope"));
    assert!(pipeline.rules(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_crud_rebuilds_rules() {
    let pipeline = pipeline_with(Vec::new()).await;
    assert!(pipeline.rules(1).await.unwrap().is_empty());

    pipeline
        .create_channel_rule(json_rule("stream/a/b").with_output(OutputterConfig::managed_stream()))
        .await
        .unwrap();
    pipeline.dispatch(&editor(), 1, "stream/a/b", br#"{"value": 1}"#).await.unwrap();

    let err = pipeline.create_channel_rule(json_rule("stream/a/b")).await.unwrap_err();
    assert!(matches!(err, PipelineError::RuleExists { .. }));

    let err = pipeline.update_channel_rule(json_rule("stream/x/y")).await.unwrap_err();
    assert!(matches!(err, PipelineError::RuleNotFound { .. }));

    pipeline
        .update_channel_rule(json_rule("stream/a/b").with_output(OutputterConfig::redirect("stream/a/c")))
        .await
        .unwrap();
    let err = pipeline
        .dispatch(&editor(), 1, "stream/a/b", br#"{"value": 1}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoRule { .. }));

    pipeline.delete_channel_rule(1, "stream/a/b").await.unwrap();
    assert!(pipeline.rules(1).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_colliding_creates_store_one() {
    for _ in 0..20 {
        let pipeline = pipeline_with(Vec::new()).await;
        let (x, y) = tokio::join!(
            pipeline.create_channel_rule(json_rule("stream/a/:x/c")),
            pipeline.create_channel_rule(json_rule("stream/a/:y/d")),
        );
        assert_eq!(usize::from(x.is_ok()) + usize::from(y.is_ok()), 1);
        assert_eq!(pipeline.rules(1).await.unwrap().len(), 1);
    }
}

/// `managedAlias` builds a managed stream outputter
fn build_managed_alias(
    _config: &OutputterConfig,
    ctx: &BuildContext<'_>,
    depth: usize,
) -> Result<Box<dyn crate::outputter::Outputter>> {
    ctx.build_outputter(&OutputterConfig::managed_stream(), depth + 1)
}

#[tokio::test]
async fn test_rule_with_registered_type_is_stored() {
    let storage = Arc::new(MemoryRuleStorage::new());
    let mut builder = RuleBuilder::new(Arc::new(Services::new(&PipelineConfig::default())));
    builder
        .outputters_mut()
        .register("managedAlias", Box::new(build_managed_alias));
    let pipeline = Pipeline::with_rule_builder(PipelineConfig::default(), storage, builder);

    pipeline
        .create_channel_rule(json_rule("stream/a/b").with_output(OutputterConfig::of_type("managedAlias")))
        .await
        .unwrap();
    assert_eq!(pipeline.rules(1).await.unwrap().len(), 1);
    pipeline.dispatch(&editor(), 1, "stream/a/b", br#"{"value": 1}"#).await.unwrap();
}

#[tokio::test]
async fn test_colliding_rule_is_rejected() {
    let pipeline = pipeline_with(vec![json_rule("stream/a/:x/c")]).await;
    let err = pipeline
        .create_channel_rule(json_rule("stream/a/:y/d"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}
