//! `live publish`: run one payload through the pipeline
//!
//! Rules are loaded into memory from the rule document. Local subscribers are
//! registered on the listen channels before dispatch; everything they receive
//! is printed as `<channel>\t<message>` lines once dispatch returns.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, ValueEnum};
use live_config::{Config, OrgId, Role};
use live_pipeline::{LiveContext, MemoryRuleStorage, Pipeline};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::info;

/// Caller role for the publish
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Viewer,
    Editor,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Viewer => Role::Viewer,
            RoleArg::Editor => Role::Editor,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Rule document (JSON), defaults to `[storage] rules_file`
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Organization ID
    #[arg(short, long)]
    pub org: OrgId,

    /// Channel to publish to
    #[arg(long)]
    pub channel: String,

    /// Payload file, stdin when omitted
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Channels whose local subscriber messages are printed (default: --channel)
    #[arg(long)]
    pub listen: Vec<String>,

    /// Role of the publishing user
    #[arg(long, value_enum, default_value_t = RoleArg::Editor)]
    pub role: RoleArg,
}

pub async fn run(args: PublishArgs, config: &Config) -> Result<()> {
    let doc = super::load_rules(args.rules, config)?;
    let data = read_payload(args.data.as_deref()).await?;
    let pipeline = Pipeline::new(
        config.pipeline.clone(),
        Arc::new(MemoryRuleStorage::from_document(doc)),
    );

    let listen = if args.listen.is_empty() {
        vec![args.channel.clone()]
    } else {
        args.listen
    };
    let mut receivers = Vec::with_capacity(listen.len());
    for channel in listen {
        let rx = pipeline
            .hub()
            .subscribe(args.org, &channel)
            .with_context(|| format!("listening on {channel}"))?;
        receivers.push((channel, rx));
    }

    let ctx = LiveContext::new(args.role.into());
    let result = pipeline.dispatch(&ctx, args.org, &args.channel, &data).await;

    let printed = print_messages(&mut io::stdout().lock(), &mut receivers)?;
    let stats = pipeline.metrics().snapshot();
    info!(
        org_id = args.org,
        channel = %args.channel,
        frames_output = stats.frames_output,
        redirects = stats.redirects,
        output_failures = stats.output_failures,
        printed,
        "publish finished"
    );

    result.with_context(|| format!("publishing to {}", args.channel))
}

async fn read_payload(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading payload from {}", path.display())),
        None => {
            let mut data = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut data)
                .await
                .context("reading payload from stdin")?;
            Ok(data)
        }
    }
}

/// Drain queued messages, one line per message
fn print_messages<W: Write>(
    out: &mut W,
    receivers: &mut [(String, mpsc::Receiver<Bytes>)],
) -> io::Result<usize> {
    let mut count = 0;
    for (channel, rx) in receivers.iter_mut() {
        while let Ok(message) = rx.try_recv() {
            writeln!(out, "{channel}\t{}", String::from_utf8_lossy(&message))?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_config::{ChannelRuleConfig, ConverterConfig, OutputterConfig, RulesDocument};
    use live_pipeline::LocalHub;

    fn write_rules(dir: &Path, doc: &RulesDocument) -> PathBuf {
        let path = dir.join("rules.json");
        std::fs::write(&path, doc.to_json_pretty().unwrap()).unwrap();
        path
    }

    fn args(rules: PathBuf, data: PathBuf, channel: &str) -> PublishArgs {
        PublishArgs {
            rules: Some(rules),
            org: 1,
            channel: channel.to_string(),
            data: Some(data),
            listen: Vec::new(),
            role: RoleArg::Editor,
        }
    }

    // =========================================================================
    // Output
    // =========================================================================

    #[test]
    fn test_print_messages_in_channel_order() {
        let hub = LocalHub::new(8, 8);
        let mut receivers = vec![
            ("a".to_string(), hub.subscribe(1, "a").unwrap()),
            ("b".to_string(), hub.subscribe(1, "b").unwrap()),
        ];
        hub.publish(1, "b", Bytes::from_static(b"two"));
        hub.publish(1, "a", Bytes::from_static(b"one"));

        let mut out = Vec::new();
        let count = print_messages(&mut out, &mut receivers).unwrap();

        assert_eq!(count, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "a\tone\nb\ttwo\n");
    }

    #[test]
    fn test_role_conversion() {
        assert_eq!(Role::from(RoleArg::Viewer), Role::Viewer);
        assert_eq!(Role::from(RoleArg::Admin), Role::Admin);
    }

    // =========================================================================
    // Run
    // =========================================================================

    #[tokio::test]
    async fn test_run_publishes_through_rules() {
        let dir = tempfile::tempdir().unwrap();
        let doc = RulesDocument {
            rules: vec![
                ChannelRuleConfig::new(1, "stream/metrics/:host")
                    .with_converter(ConverterConfig::of_type("jsonAuto"))
                    .with_output(OutputterConfig::local_subscribers()),
            ],
            ..Default::default()
        };
        let rules = write_rules(dir.path(), &doc);
        let data = dir.path().join("payload.json");
        std::fs::write(&data, br#"{"cpu": 0.5}"#).unwrap();

        run(args(rules, data, "stream/metrics/web1"), &Config::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_reports_missing_rule() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write_rules(dir.path(), &RulesDocument::default());
        let data = dir.path().join("payload.json");
        std::fs::write(&data, b"{}").unwrap();

        let err = run(args(rules, data, "stream/none"), &Config::default())
            .await
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("publishing to stream/none"));
        assert!(message.contains("no rule matches"));
    }

    #[tokio::test]
    async fn test_run_missing_payload_file() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write_rules(dir.path(), &RulesDocument::default());

        let err = run(
            args(rules, dir.path().join("absent.json"), "stream/a"),
            &Config::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("reading payload"));
    }
}
