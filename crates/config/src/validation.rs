//! Rule validation
//!
//! `ChannelRuleConfig::validate` checks one rule in isolation: pattern syntax,
//! every nested type name, required option sections and nesting depth.
//! `check_rules_valid` checks a rule set as a whole by inserting every
//! pattern of each organization into a fresh route tree.
//!
//! Type names are checked against a [`TypeCatalog`]. The plain functions use
//! [`BuiltinTypes`]; a pipeline with extra registered component types passes
//! its own catalog to the `_with` variants.

use std::collections::HashMap;

use live_routing::{Pattern, RouteTree};

use crate::error::{ConfigError, Result};
use crate::rules::{
    ChannelRuleConfig, ConditionCheckerConfig, ConverterConfig, DataOutputterConfig, OrgId,
    OutputterConfig, ProcessorConfig, SubscriberConfig,
};
use crate::service::PipelineConfig;
use crate::types::{
    MAX_NESTING_DEPTH, is_known_condition_type, is_known_converter_type,
    is_known_data_outputter_type, is_known_outputter_type, is_known_processor_type,
    is_known_subscriber_type,
};

/// Type names a rule may use, per component
///
/// `component` is one of `converter`, `processor`, `condition`, `outputter`,
/// `subscriber` or `data outputter`.
pub trait TypeCatalog {
    fn contains(&self, component: &str, type_name: &str) -> bool;
}

/// The built-in component types
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTypes;

impl TypeCatalog for BuiltinTypes {
    fn contains(&self, component: &str, type_name: &str) -> bool {
        match component {
            "converter" => is_known_converter_type(type_name),
            "processor" => is_known_processor_type(type_name),
            "condition" => is_known_condition_type(type_name),
            "outputter" => is_known_outputter_type(type_name),
            "subscriber" => is_known_subscriber_type(type_name),
            "data outputter" => is_known_data_outputter_type(type_name),
            _ => false,
        }
    }
}

impl ChannelRuleConfig {
    /// Validate this rule on its own against the built-in types
    ///
    /// # Errors
    ///
    /// Invalid pattern syntax, an unknown type at any nesting level, a type
    /// missing its required options section, or nesting deeper than
    /// `MAX_NESTING_DEPTH`.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(&BuiltinTypes)
    }

    /// Validate this rule, resolving type names through `catalog`
    pub fn validate_with(&self, catalog: &dyn TypeCatalog) -> Result<()> {
        Pattern::parse(&self.pattern)?;

        let v = RuleValidator {
            pattern: &self.pattern,
            catalog,
        };
        let settings = &self.settings;
        if let Some(converter) = &settings.converter {
            v.converter(converter)?;
        }
        for processor in &settings.processors {
            v.processor(processor, 0)?;
        }
        for output in &settings.outputs {
            v.outputter(output, 0)?;
        }
        for subscriber in &settings.subscribers {
            v.subscriber(subscriber, 0)?;
        }
        for output in &settings.data_outputs {
            v.data_outputter(output)?;
        }
        Ok(())
    }
}

/// Validate a set of rules, including pattern collisions per organization
///
/// Each rule is validated first; then every organization's patterns are
/// inserted into a fresh route tree and the first collision is reported.
pub fn check_rules_valid<'a, I>(rules: I) -> Result<()>
where
    I: IntoIterator<Item = &'a ChannelRuleConfig>,
{
    check_rules_valid_with(rules, &BuiltinTypes)
}

/// [`check_rules_valid`] with type names resolved through `catalog`
pub fn check_rules_valid_with<'a, I>(rules: I, catalog: &dyn TypeCatalog) -> Result<()>
where
    I: IntoIterator<Item = &'a ChannelRuleConfig>,
{
    let mut trees: HashMap<OrgId, RouteTree<()>> = HashMap::new();
    for rule in rules {
        rule.validate_with(catalog)?;
        trees
            .entry(rule.org_id)
            .or_default()
            .insert(&rule.pattern, ())?;
    }
    Ok(())
}

impl PipelineConfig {
    /// Check limits are usable
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("max_redirect_hops", self.max_redirect_hops),
            ("subscriber_buffer", self.subscriber_buffer),
            ("max_subscribers_per_channel", self.max_subscribers_per_channel),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::invalid_value(
                    "section",
                    "pipeline",
                    field,
                    "must be at least 1",
                ));
            }
        }
        if self.remote_write_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "section",
                "pipeline",
                "remote_write_timeout_ms",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

struct RuleValidator<'a> {
    pattern: &'a str,
    catalog: &'a dyn TypeCatalog,
}

impl RuleValidator<'_> {
    fn known(&self, component: &'static str, type_name: &str) -> Result<()> {
        if self.catalog.contains(component, type_name) {
            Ok(())
        } else {
            Err(ConfigError::unknown_type(component, type_name, self.pattern))
        }
    }

    fn require<T>(&self, component: &'static str, type_name: &str, section: Option<&T>) -> Result<()> {
        match section {
            Some(_) => Ok(()),
            None => Err(ConfigError::missing_settings(component, type_name, self.pattern)),
        }
    }

    fn depth(&self, component: &'static str, depth: usize) -> Result<()> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(ConfigError::too_deep(component, self.pattern, MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn converter(&self, c: &ConverterConfig) -> Result<()> {
        let t = c.converter_type.as_str();
        self.known("converter", t)?;
        if t == "jsonExact" {
            self.require("converter", t, c.json_exact.as_ref())?;
        }
        Ok(())
    }

    fn processor(&self, p: &ProcessorConfig, depth: usize) -> Result<()> {
        self.depth("processor", depth)?;
        let t = p.processor_type.as_str();
        self.known("processor", t)?;
        match t {
            "dropFields" => self.require("processor", t, p.drop_fields.as_ref()),
            "keepFields" => self.require("processor", t, p.keep_fields.as_ref()),
            "multiple" => {
                self.require("processor", t, p.multiple.as_ref())?;
                for child in p.multiple.iter().flat_map(|m| &m.processors) {
                    self.processor(child, depth + 1)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn condition(&self, c: &ConditionCheckerConfig, depth: usize) -> Result<()> {
        self.depth("condition", depth)?;
        let t = c.condition_type.as_str();
        self.known("condition", t)?;
        match t {
            "numberCompare" => self.require("condition", t, c.number_compare.as_ref()),
            "multiple" => {
                self.require("condition", t, c.multiple.as_ref())?;
                for child in c.multiple.iter().flat_map(|m| &m.conditions) {
                    self.condition(child, depth + 1)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn outputter(&self, o: &OutputterConfig, depth: usize) -> Result<()> {
        self.depth("outputter", depth)?;
        let t = o.outputter_type.as_str();
        self.known("outputter", t)?;
        match t {
            "redirect" => self.require("outputter", t, o.redirect.as_ref()),
            "threshold" => self.require("outputter", t, o.threshold.as_ref()),
            "remoteWrite" => self.require("outputter", t, o.remote_write.as_ref()),
            "changeLog" => self.require("outputter", t, o.change_log.as_ref()),
            "conditional" => {
                self.require("outputter", t, o.conditional.as_ref())?;
                if let Some(conditional) = &o.conditional {
                    self.condition(&conditional.condition, 0)?;
                    self.outputter(&conditional.output, depth + 1)?;
                }
                Ok(())
            }
            "multiple" => {
                self.require("outputter", t, o.multiple.as_ref())?;
                for child in o.multiple.iter().flat_map(|m| &m.outputs) {
                    self.outputter(child, depth + 1)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn subscriber(&self, s: &SubscriberConfig, depth: usize) -> Result<()> {
        self.depth("subscriber", depth)?;
        let t = s.subscriber_type.as_str();
        self.known("subscriber", t)?;
        if t == "multiple" {
            self.require("subscriber", t, s.multiple.as_ref())?;
            for child in s.multiple.iter().flat_map(|m| &m.subscribers) {
                self.subscriber(child, depth + 1)?;
            }
        }
        Ok(())
    }

    fn data_outputter(&self, d: &DataOutputterConfig) -> Result<()> {
        let t = d.data_outputter_type.as_str();
        self.known("data outputter", t)?;
        if t == "redirect" {
            self.require("data outputter", t, d.redirect.as_ref())?;
        }
        Ok(())
    }
}
