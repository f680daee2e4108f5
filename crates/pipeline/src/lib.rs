//! Live Pipeline
//!
//! Rule-driven dispatch for live channels: the channel hub calls
//! `Pipeline::dispatch` for every published payload and
//! `Pipeline::on_subscribe` for every subscribe.
//!
//! # Architecture
//!
//! ```text
//!                 RuleStorage ──► RuleBuilder ──► RuleCache (Arc<OrgRules> per org)
//!                                                      │
//! publish ──► Pipeline::dispatch ──► RouteTree lookup ─┘
//!                 │
//!                 ├─► data outputters (raw bytes)
//!                 └─► Converter ──► ProcessorChain ──► MultipleOutputter
//!                                                        ├─► managedStream ─► LocalHub
//!                                                        ├─► threshold / changeLog ─► FrameStorage
//!                                                        ├─► remoteWrite ─► HTTP
//!                                                        └─► redirect ─► dispatch again (hop + 1)
//! ```
//!
//! # Key Design
//!
//! - **Immutable snapshots**: built rules are shared as `Arc<OrgRules>`;
//!   a configuration change builds a new snapshot and swaps it in
//! - **Fail-fast builds**: unknown types, missing options and unknown
//!   remote write backends fail the organization's build, never dispatch
//! - **Sink isolation**: outputters of a rule run concurrently; one failing
//!   sink never stops the others, failures are returned together
//! - **Per-key state**: `FrameStorage` serializes read-modify-write per
//!   (org, channel, state) key so concurrent publishes see one transition
//! - **Bounded redirects**: redirected frames are queued with a hop count
//!   and dispatch fails once `max_redirect_hops` is exceeded
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use live_config::{ChannelRuleConfig, ConverterConfig, OutputterConfig, PipelineConfig, Role};
//! use live_pipeline::{LiveContext, MemoryRuleStorage, Pipeline};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(MemoryRuleStorage::new()));
//! pipeline
//!     .create_channel_rule(
//!         ChannelRuleConfig::new(1, "stream/metrics/:host")
//!             .with_converter(ConverterConfig::of_type("jsonAuto"))
//!             .with_output(OutputterConfig::managed_stream()),
//!     )
//!     .await
//!     .unwrap();
//!
//! let ctx = LiveContext::new(Role::Editor);
//! pipeline
//!     .dispatch(&ctx, 1, "stream/metrics/web1", br#"{"cpu": 0.5}"#)
//!     .await
//!     .unwrap();
//!
//! let latest = pipeline.services().streams.latest(1, "stream/metrics/web1").unwrap();
//! assert_eq!(latest.field("cpu").unwrap().latest_f64(), Some(0.5));
//! # }
//! ```

pub mod builder;
pub mod data_output;
pub mod handler;
pub mod outputter;
pub mod subscriber;

mod cache;
mod context;
mod error;
mod hub;
mod managed;
mod metrics;
mod pipeline;
mod rule_storage;
mod storage;
mod template;

pub use builder::{BuildContext, ChannelRule, OrgRules, RuleBuilder, Services};
pub use cache::RuleCache;
pub use context::{ChannelContext, ChannelData, ChannelFrame, LiveContext, SubscribeReply};
pub use data_output::{DataOutputter, DataOutputterFactory, DataOutputterRegistry};
pub use error::{PipelineError, Result};
pub use handler::{ChannelHandler, HandlerSet, StreamHandler};
pub use hub::LocalHub;
pub use managed::ManagedStreams;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use outputter::{Outputter, OutputterFactory, OutputterRegistry};
pub use pipeline::Pipeline;
pub use rule_storage::{FileRuleStorage, MemoryRuleStorage, RuleStorage};
pub use storage::{FrameKey, FrameStorage};
pub use subscriber::{Subscriber, SubscriberFactory, SubscriberRegistry};
pub use template::ChannelTemplate;
