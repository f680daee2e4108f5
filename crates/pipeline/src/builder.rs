//! Rule builder - compile rule configs into live channel rules
//!
//! Every nested config is built by looking up its `type` in a registry, so an
//! unknown type or a missing options section fails the build with the type
//! name and the rule's pattern. Remote write backends are resolved here too:
//! an unknown UID is a build error, never a dispatch-time one.
//!
//! A build failure in any rule fails the whole organization's rule set.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use live_config::{
    ChannelRuleConfig, ConditionCheckerConfig, DataOutputterConfig, OrgId, OutputterConfig,
    PipelineConfig, RemoteWriteBackend, Role, SubscriberConfig, TypeCatalog,
    check_rules_valid_with,
};
use live_routing::{RouteMatch, RouteTree};
use live_transform::{
    ConditionChecker, ConditionRegistry, Converter, ConverterRegistry, ProcessorChain,
    ProcessorRegistry, check_depth, default_condition_registry, default_converter_registry,
    default_processor_registry,
};
use tracing::{debug, info};

use crate::data_output::{DataOutputter, DataOutputterRegistry, default_data_outputter_registry};
use crate::handler::HandlerSet;
use crate::hub::LocalHub;
use crate::managed::ManagedStreams;
use crate::outputter::{MultipleOutputter, Outputter, OutputterRegistry, default_outputter_registry};
use crate::storage::FrameStorage;
use crate::subscriber::{
    MultipleSubscriber, Subscriber, SubscriberRegistry, default_subscriber_registry,
};
use crate::{PipelineError, Result};

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;

/// Shared state handed to the components built for every rule
pub struct Services {
    /// Threshold and change log state
    pub storage: Arc<FrameStorage>,
    pub hub: Arc<LocalHub>,
    pub streams: Arc<ManagedStreams>,
    pub handlers: Arc<HandlerSet>,
    /// Client shared by all remote write outputters
    pub http: reqwest::Client,
    pub remote_write_timeout: Duration,
}

impl Services {
    pub fn new(config: &PipelineConfig) -> Self {
        let hub = Arc::new(LocalHub::from_config(config));
        let streams = Arc::new(ManagedStreams::new(Arc::clone(&hub)));
        let handlers = Arc::new(HandlerSet::with_streams(Arc::clone(&streams)));
        Self {
            storage: Arc::new(FrameStorage::new()),
            hub,
            streams,
            handlers,
            http: reqwest::Client::new(),
            remote_write_timeout: config.remote_write_timeout(),
        }
    }

    /// Replace the scope handlers
    #[must_use]
    pub fn with_handlers(mut self, handlers: HandlerSet) -> Self {
        self.handlers = Arc::new(handlers);
        self
    }
}

/// What a factory sees while building one rule
pub struct BuildContext<'a> {
    builder: &'a RuleBuilder,
    org_id: OrgId,
    backends: &'a [RemoteWriteBackend],
    /// Stateful outputters built so far in this rule
    state_ids: Cell<usize>,
}

impl<'a> BuildContext<'a> {
    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    pub fn services(&self) -> &'a Services {
        &self.builder.services
    }

    /// Storage scope for one stateful outputter of this rule
    ///
    /// Each call returns a new scope (`<kind>#<n>/<field>`, numbered in build
    /// order), so two outputters on the same channel never share state.
    /// Rebuilding an unchanged rule yields the same scopes.
    pub fn state_scope(&self, kind: &str, field: &str) -> String {
        let id = self.state_ids.get();
        self.state_ids.set(id + 1);
        format!("{kind}#{id}/{field}")
    }

    /// Resolve a remote write backend of this organization by UID
    pub fn backend(&self, uid: &str) -> Result<&'a RemoteWriteBackend> {
        self.backends
            .iter()
            .find(|b| b.org_id == self.org_id && b.uid == uid)
            .ok_or_else(|| PipelineError::UnknownBackend {
                uid: uid.to_string(),
            })
    }

    /// Build a (possibly nested) outputter
    pub fn build_outputter(&self, config: &OutputterConfig, depth: usize) -> Result<Box<dyn Outputter>> {
        check_depth("outputter", depth)?;
        self.builder
            .outputters
            .get(&config.outputter_type)?
            .create(config, self, depth)
    }

    /// Build a (possibly nested) subscriber
    pub fn build_subscriber(
        &self,
        config: &SubscriberConfig,
        depth: usize,
    ) -> Result<Box<dyn Subscriber>> {
        check_depth("subscriber", depth)?;
        self.builder
            .subscribers
            .get(&config.subscriber_type)?
            .create(config, self, depth)
    }

    pub fn build_data_outputter(&self, config: &DataOutputterConfig) -> Result<Box<dyn DataOutputter>> {
        self.builder
            .data_outputters
            .get(&config.data_outputter_type)?
            .create(config, self)
    }

    pub fn build_condition(&self, config: &ConditionCheckerConfig) -> Result<Box<dyn ConditionChecker>> {
        Ok(self.builder.conditions.build(config)?)
    }
}

/// A compiled channel rule, read-only once built
pub struct ChannelRule {
    pub org_id: OrgId,
    pub pattern: String,
    pub subscribe_role: Role,
    pub publish_role: Role,
    pub converter: Option<Box<dyn Converter>>,
    pub processors: ProcessorChain,
    pub outputs: MultipleOutputter,
    pub subscribers: MultipleSubscriber,
    pub data_outputs: Vec<Box<dyn DataOutputter>>,
}

impl fmt::Debug for ChannelRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRule")
            .field("org_id", &self.org_id)
            .field("pattern", &self.pattern)
            .field("converter", &self.converter.as_ref().map(|c| c.type_name()))
            .field("processors", &self.processors)
            .field("outputs", &self.outputs.len())
            .field("subscribers", &self.subscribers.len())
            .field("data_outputs", &self.data_outputs.len())
            .finish()
    }
}

/// All rules of one organization behind a route tree
pub struct OrgRules {
    org_id: OrgId,
    tree: RouteTree<Arc<ChannelRule>>,
}

impl OrgRules {
    /// Organization without rules
    pub fn empty(org_id: OrgId) -> Self {
        Self {
            org_id,
            tree: RouteTree::new(),
        }
    }

    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Best matching rule for a channel
    pub fn lookup(&self, channel: &str) -> Option<RouteMatch<'_, Arc<ChannelRule>>> {
        self.tree.lookup(channel)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// Compiles rule configs using the component registries
pub struct RuleBuilder {
    converters: ConverterRegistry,
    processors: ProcessorRegistry,
    conditions: ConditionRegistry,
    outputters: OutputterRegistry,
    subscribers: SubscriberRegistry,
    data_outputters: DataOutputterRegistry,
    services: Arc<Services>,
}

impl RuleBuilder {
    /// Builder with every built-in component type registered
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            converters: default_converter_registry(),
            processors: default_processor_registry(),
            conditions: default_condition_registry(),
            outputters: default_outputter_registry(),
            subscribers: default_subscriber_registry(),
            data_outputters: default_data_outputter_registry(),
            services,
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Register additional outputter types
    pub fn outputters_mut(&mut self) -> &mut OutputterRegistry {
        &mut self.outputters
    }

    /// Register additional subscriber types
    pub fn subscribers_mut(&mut self) -> &mut SubscriberRegistry {
        &mut self.subscribers
    }

    /// Build one rule
    ///
    /// `backends` may hold backends of any organization; only those of the
    /// rule's organization are visible to it.
    pub fn build_rule(
        &self,
        config: &ChannelRuleConfig,
        backends: &[RemoteWriteBackend],
    ) -> Result<ChannelRule> {
        let ctx = BuildContext {
            builder: self,
            org_id: config.org_id,
            backends,
            state_ids: Cell::new(0),
        };
        let settings = &config.settings;
        let auth = settings.auth.unwrap_or_default();

        let converter = settings
            .converter
            .as_ref()
            .map(|c| self.converters.build(c))
            .transpose()?;
        let processors = self.processors.build_chain(&settings.processors)?;
        let outputs = settings
            .outputs
            .iter()
            .map(|o| ctx.build_outputter(o, 0))
            .collect::<Result<Vec<_>>>()?;
        let subscribers = settings
            .subscribers
            .iter()
            .map(|s| ctx.build_subscriber(s, 0))
            .collect::<Result<Vec<_>>>()?;
        let data_outputs = settings
            .data_outputs
            .iter()
            .map(|d| ctx.build_data_outputter(d))
            .collect::<Result<Vec<_>>>()?;

        debug!(org_id = config.org_id, pattern = %config.pattern, "rule built");
        Ok(ChannelRule {
            org_id: config.org_id,
            pattern: config.pattern.clone(),
            subscribe_role: auth.subscribe_role(),
            publish_role: auth.publish_role(),
            converter,
            processors,
            outputs: MultipleOutputter::new(outputs),
            subscribers: MultipleSubscriber::new(subscribers),
            data_outputs,
        })
    }

    /// Build every rule of an organization
    ///
    /// Rules of other organizations are ignored. The rule set is validated
    /// first against this builder's registries (type names, options, pattern
    /// collisions); any failure fails the whole organization.
    pub fn build_org(
        &self,
        org_id: OrgId,
        rules: &[ChannelRuleConfig],
        backends: &[RemoteWriteBackend],
    ) -> Result<OrgRules> {
        let rules: Vec<&ChannelRuleConfig> = rules.iter().filter(|r| r.org_id == org_id).collect();
        check_rules_valid_with(rules.iter().copied(), self)?;

        let mut tree = RouteTree::new();
        for config in rules {
            let rule = self
                .build_rule(config, backends)
                .map_err(|e| PipelineError::build(&config.pattern, e))?;
            tree.insert(&config.pattern, Arc::new(rule))
                .map_err(|e| PipelineError::build(&config.pattern, e.into()))?;
        }

        info!(org_id, rules = tree.len(), "channel rules built");
        Ok(OrgRules { org_id, tree })
    }
}

impl TypeCatalog for RuleBuilder {
    fn contains(&self, component: &str, type_name: &str) -> bool {
        match component {
            "converter" => self.converters.contains(type_name),
            "processor" => self.processors.contains(type_name),
            "condition" => self.conditions.contains(type_name),
            "outputter" => self.outputters.contains(type_name),
            "subscriber" => self.subscribers.contains(type_name),
            "data outputter" => self.data_outputters.contains(type_name),
            _ => false,
        }
    }
}
