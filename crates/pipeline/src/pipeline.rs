//! Pipeline facade - entry points used by the channel hub
//!
//! ```text
//! dispatch(org, channel, bytes)
//!   │
//!   ▼
//! RouteTree ──► data outputters ──► Converter ──► ProcessorChain ──► outputters
//!   ▲                │                                                  │
//!   └──── raw redirects (hop + 1) ◄──────── frame redirects (hop + 1) ◄─┘
//! ```
//!
//! Redirects are queued, not recursed into: every queued item carries its
//! hop count and dispatch fails once it exceeds `max_redirect_hops`.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use live_config::{ChannelRuleConfig, OrgId, PipelineConfig, Role};
use live_frame::Frame;
use live_routing::RouteMatch;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::builder::{ChannelRule, OrgRules, RuleBuilder, Services};
use crate::cache::RuleCache;
use crate::context::{ChannelContext, LiveContext, SubscribeReply};
use crate::hub::LocalHub;
use crate::metrics::PipelineMetrics;
use crate::rule_storage::RuleStorage;
use crate::subscriber::Subscriber;
use crate::{PipelineError, Result};

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;

enum Payload {
    Raw(Bytes),
    Frame(Frame),
}

/// One unit of dispatch work
struct Work {
    channel: String,
    payload: Payload,
    hops: usize,
}

/// Rule-driven dispatch for publish and subscribe calls
pub struct Pipeline {
    config: PipelineConfig,
    storage: Arc<dyn RuleStorage>,
    builder: RuleBuilder,
    cache: RuleCache,
    metrics: PipelineMetrics,
    /// Held across the read-check-write of rule create, update and delete
    rule_writes: Mutex<()>,
}

impl Pipeline {
    /// Pipeline with the built-in component types
    pub fn new(config: PipelineConfig, storage: Arc<dyn RuleStorage>) -> Self {
        let services = Arc::new(Services::new(&config));
        Self::with_rule_builder(config, storage, RuleBuilder::new(services))
    }

    /// Pipeline with a custom rule builder (extra component types, handlers)
    pub fn with_rule_builder(
        config: PipelineConfig,
        storage: Arc<dyn RuleStorage>,
        builder: RuleBuilder,
    ) -> Self {
        Self {
            config,
            storage,
            builder,
            cache: RuleCache::new(),
            metrics: PipelineMetrics::new(),
            rule_writes: Mutex::new(()),
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        self.builder.services()
    }

    /// Local subscriber hub
    pub fn hub(&self) -> &Arc<LocalHub> {
        &self.services().hub
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Current rule snapshot of an organization, built on first use
    pub async fn rules(&self, org_id: OrgId) -> Result<Arc<OrgRules>> {
        if let Some(rules) = self.cache.get(org_id) {
            return Ok(rules);
        }

        let generation = self.cache.generation();
        let configs = self.storage.list_channel_rules(org_id).await?;
        let backends = self.storage.list_remote_write_backends(org_id).await?;
        let rules = Arc::new(self.builder.build_org(org_id, &configs, &backends)?);
        if !self.cache.insert_if_current(org_id, generation, Arc::clone(&rules)) {
            debug!(org_id, "rules changed during build, snapshot not cached");
        }
        Ok(rules)
    }

    /// Drop the cached rules of an organization
    pub fn invalidate(&self, org_id: OrgId) {
        if self.cache.invalidate(org_id) {
            info!(org_id, "channel rules invalidated");
        }
    }

    // =========================================================================
    // Publish
    // =========================================================================

    /// Run a published payload through the matching rule
    ///
    /// # Errors
    ///
    /// Fails without side effects when no rule matches, the caller's role is
    /// too low or the payload cannot be decoded. Sink failures do not stop
    /// other sinks; they are returned together once dispatch has finished,
    /// or together with `TooManyHops` when the redirect limit stops it.
    pub async fn dispatch(
        &self,
        ctx: &LiveContext,
        org_id: OrgId,
        channel: &str,
        data: &[u8],
    ) -> Result<()> {
        let rules = self.rules(org_id).await?;
        let limit = self.config.max_redirect_hops;

        let mut queue = VecDeque::from([Work {
            channel: channel.to_string(),
            payload: Payload::Raw(Bytes::copy_from_slice(data)),
            hops: 0,
        }]);
        let mut errors = Vec::new();

        while let Some(work) = queue.pop_front() {
            if ctx.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if work.hops > limit {
                warn!(org_id, channel = %work.channel, limit, "redirect limit exceeded");
                errors.push(PipelineError::TooManyHops {
                    channel: work.channel,
                    limit,
                });
                return PipelineError::collect(errors);
            }

            let Some(RouteMatch { value, params, .. }) = rules.lookup(&work.channel) else {
                let err = PipelineError::NoRule {
                    channel: work.channel,
                };
                if work.hops == 0 {
                    return Err(err);
                }
                errors.push(err);
                continue;
            };
            let rule = Arc::clone(value);

            if work.hops == 0 {
                check_role("publish", &work.channel, rule.publish_role, ctx.role)?;
                self.metrics.record_published();
            }

            let call = ChannelContext {
                org_id,
                channel: &work.channel,
                params: &params,
                cancel: &ctx.cancel,
            };
            let mut step = Step {
                queue: &mut queue,
                errors: &mut errors,
                hops: work.hops,
            };
            match work.payload {
                Payload::Raw(data) => self.process_raw(&rule, &call, &data, &mut step).await?,
                Payload::Frame(frame) => self.process_frame(&rule, &call, frame, &mut step).await,
            }
        }

        PipelineError::collect(errors)
    }

    async fn process_raw(
        &self,
        rule: &ChannelRule,
        call: &ChannelContext<'_>,
        data: &Bytes,
        step: &mut Step<'_>,
    ) -> Result<()> {
        let results = join_all(rule.data_outputs.iter().map(|o| o.output_data(call, data))).await;
        for (output, result) in rule.data_outputs.iter().zip(results) {
            match result {
                Ok(redirects) => {
                    self.metrics.record_redirects(redirects.len());
                    for redirect in redirects {
                        step.push(redirect.channel, Payload::Raw(redirect.data));
                    }
                }
                Err(e) => {
                    warn!(
                        org_id = call.org_id,
                        channel = call.channel,
                        data_outputter = output.type_name(),
                        error = %e,
                        "data outputter failed"
                    );
                    self.metrics.record_output_failures(1);
                    step.errors.push(e);
                }
            }
        }

        let Some(converter) = &rule.converter else {
            if rule.data_outputs.is_empty() {
                debug!(org_id = call.org_id, channel = call.channel, "rule has no converter, payload dropped");
            }
            return Ok(());
        };

        let frames = match converter.convert(call.channel, data) {
            Ok(frames) => frames,
            Err(e) => {
                self.metrics.record_decode_failure();
                debug!(
                    org_id = call.org_id,
                    channel = call.channel,
                    converter = converter.type_name(),
                    error = %e,
                    "payload rejected"
                );
                // The publisher's own payload is rejected; a redirected one
                // is reported alongside other sink failures.
                if step.hops == 0 {
                    return Err(e.into());
                }
                step.errors.push(e.into());
                return Ok(());
            }
        };

        for frame in frames {
            self.process_frame(rule, call, frame, step).await;
        }
        Ok(())
    }

    async fn process_frame(
        &self,
        rule: &ChannelRule,
        call: &ChannelContext<'_>,
        frame: Frame,
        step: &mut Step<'_>,
    ) {
        let frame = match rule.processors.apply(frame) {
            Ok(frame) => frame,
            Err(e) => {
                self.metrics.record_output_failures(1);
                step.errors.push(e.into());
                return;
            }
        };

        let (redirects, failures) = rule.outputs.output_all(call, &frame).await;
        self.metrics.record_frame_output();
        self.metrics.record_output_failures(failures.len());
        self.metrics.record_redirects(redirects.len());
        step.errors.extend(failures);
        for redirect in redirects {
            step.push(redirect.channel, Payload::Frame(redirect.frame));
        }
    }

    // =========================================================================
    // Subscribe
    // =========================================================================

    /// Run the subscriber chain of the matching rule
    ///
    /// A rule without subscribers falls back to the channel's scope handler.
    pub async fn on_subscribe(
        &self,
        ctx: &LiveContext,
        org_id: OrgId,
        channel: &str,
    ) -> Result<SubscribeReply> {
        let result = self.subscribe_inner(ctx, org_id, channel).await;
        match &result {
            Ok(_) => self.metrics.record_subscribe(),
            Err(e) => {
                self.metrics.record_subscribe_failure();
                debug!(org_id, channel, error = %e, "subscribe refused");
            }
        }
        result
    }

    async fn subscribe_inner(
        &self,
        ctx: &LiveContext,
        org_id: OrgId,
        channel: &str,
    ) -> Result<SubscribeReply> {
        let rules = self.rules(org_id).await?;
        let RouteMatch { value, params, .. } =
            rules.lookup(channel).ok_or_else(|| PipelineError::NoRule {
                channel: channel.to_string(),
            })?;
        check_role("subscribe", channel, value.subscribe_role, ctx.role)?;

        let call = ChannelContext {
            org_id,
            channel,
            params: &params,
            cancel: &ctx.cancel,
        };
        if value.subscribers.is_empty() {
            let (address, handler) = self.services().handlers.resolve(channel)?;
            return handler.on_subscribe(&call, &address).await;
        }
        value.subscribers.subscribe(&call).await
    }

    // =========================================================================
    // Rule management
    // =========================================================================

    /// Validate, test-build and store a new rule
    pub async fn create_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig> {
        let _writing = self.rule_writes.lock().await;
        let mut rules = self.storage.list_channel_rules(rule.org_id).await?;
        if rules.iter().any(|r| r.pattern == rule.pattern) {
            return Err(PipelineError::RuleExists {
                org_id: rule.org_id,
                pattern: rule.pattern,
            });
        }
        rules.push(rule.clone());
        self.check_candidate(&rule, &rules).await?;

        let stored = self.storage.create_channel_rule(rule).await?;
        self.invalidate(stored.org_id);
        Ok(stored)
    }

    /// Validate, test-build and store a replacement for an existing rule
    pub async fn update_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig> {
        let _writing = self.rule_writes.lock().await;
        let mut rules = self.storage.list_channel_rules(rule.org_id).await?;
        let Some(existing) = rules.iter_mut().find(|r| r.pattern == rule.pattern) else {
            return Err(PipelineError::RuleNotFound {
                org_id: rule.org_id,
                pattern: rule.pattern,
            });
        };
        *existing = rule.clone();
        self.check_candidate(&rule, &rules).await?;

        let stored = self.storage.update_channel_rule(rule).await?;
        self.invalidate(stored.org_id);
        Ok(stored)
    }

    pub async fn delete_channel_rule(&self, org_id: OrgId, pattern: &str) -> Result<()> {
        let _writing = self.rule_writes.lock().await;
        self.storage.delete_channel_rule(org_id, pattern).await?;
        self.invalidate(org_id);
        Ok(())
    }

    /// Check the rule alone, then the organization's rule set with it
    async fn check_candidate(
        &self,
        rule: &ChannelRuleConfig,
        candidate_set: &[ChannelRuleConfig],
    ) -> Result<()> {
        rule.validate_with(&self.builder)?;
        let backends = self.storage.list_remote_write_backends(rule.org_id).await?;
        self.builder
            .build_org(rule.org_id, candidate_set, &backends)
            .map(|_| ())
    }
}

/// Dispatch state shared by the stages of one work item
struct Step<'a> {
    queue: &'a mut VecDeque<Work>,
    errors: &'a mut Vec<PipelineError>,
    hops: usize,
}

impl Step<'_> {
    fn push(&mut self, channel: String, payload: Payload) {
        self.queue.push_back(Work {
            channel,
            payload,
            hops: self.hops + 1,
        });
    }
}

fn check_role(action: &'static str, channel: &str, required: Role, actual: Role) -> Result<()> {
    if actual < required {
        return Err(PipelineError::Forbidden {
            action,
            channel: channel.to_string(),
            required,
            actual,
        });
    }
    Ok(())
}
