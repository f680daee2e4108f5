//! Channel rule configuration
//!
//! Rules are stored as JSON. Every nested component is a `type` string plus
//! an optional section named after the type holding its options:
//!
//! ```json
//! {
//!   "orgId": 1,
//!   "pattern": "stream/telegraf/:metric",
//!   "settings": {
//!     "auth": {"publish": {"role": "admin"}},
//!     "converter": {"type": "influxAuto"},
//!     "outputs": [
//!       {"type": "conditional", "conditional": {
//!         "condition": {"type": "numberCompare",
//!                       "numberCompare": {"fieldName": "value", "op": "gt", "value": 90}},
//!         "output": {"type": "managedStream"}
//!       }}
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use live_frame::FieldType;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Organization identifier
pub type OrgId = i64;

// =============================================================================
// Rule
// =============================================================================

/// One stored channel rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRuleConfig {
    #[serde(default)]
    pub org_id: OrgId,
    pub pattern: String,
    #[serde(default)]
    pub settings: ChannelRuleSettings,
}

impl ChannelRuleConfig {
    /// Create a rule with empty settings
    pub fn new(org_id: OrgId, pattern: impl Into<String>) -> Self {
        Self {
            org_id,
            pattern: pattern.into(),
            settings: ChannelRuleSettings::default(),
        }
    }

    /// Set the converter, builder style
    #[must_use]
    pub fn with_converter(mut self, converter: ConverterConfig) -> Self {
        self.settings.converter = Some(converter);
        self
    }

    /// Append a processor, builder style
    #[must_use]
    pub fn with_processor(mut self, processor: ProcessorConfig) -> Self {
        self.settings.processors.push(processor);
        self
    }

    /// Append an outputter, builder style
    #[must_use]
    pub fn with_output(mut self, output: OutputterConfig) -> Self {
        self.settings.outputs.push(output);
        self
    }

    /// Append a subscriber, builder style
    #[must_use]
    pub fn with_subscriber(mut self, subscriber: SubscriberConfig) -> Self {
        self.settings.subscribers.push(subscriber);
        self
    }

    /// Append a data outputter, builder style
    #[must_use]
    pub fn with_data_output(mut self, output: DataOutputterConfig) -> Self {
        self.settings.data_outputs.push(output);
        self
    }
}

/// Rule settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelRuleSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<RuleAuthConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converter: Option<ConverterConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub processors: Vec<ProcessorConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputterConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<SubscriberConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_outputs: Vec<DataOutputterConfig>,
}

// =============================================================================
// Auth
// =============================================================================

/// Organization role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum role for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCheckConfig {
    pub role: Role,
}

/// Per-rule auth policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<RoleCheckConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<RoleCheckConfig>,
}

impl RuleAuthConfig {
    /// Role required to subscribe (viewer when unset)
    pub fn subscribe_role(&self) -> Role {
        self.subscribe.map_or(Role::Viewer, |c| c.role)
    }

    /// Role required to publish (editor when unset)
    pub fn publish_role(&self) -> Role {
        self.publish.map_or(Role::Editor, |c| c.role)
    }
}

// =============================================================================
// Converters
// =============================================================================

/// Converter selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterConfig {
    #[serde(rename = "type")]
    pub converter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_auto: Option<JsonAutoConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_exact: Option<JsonExactConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influx_auto: Option<InfluxAutoConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_frame: Option<JsonFrameConfig>,
}

impl ConverterConfig {
    /// Converter of the given type with no options
    pub fn of_type(converter_type: impl Into<String>) -> Self {
        Self {
            converter_type: converter_type.into(),
            json_auto: None,
            json_exact: None,
            influx_auto: None,
            json_frame: None,
        }
    }
}

/// Options for `jsonAuto`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonAutoConfig {
    /// Force a type for a flattened key (`a.b.c`)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_tips: BTreeMap<String, FieldTip>,
}

/// Type hint for one auto-detected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTip {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Options for `jsonExact`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonExactConfig {
    pub fields: Vec<ExactFieldConfig>,
}

/// One field extracted by `jsonExact`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactFieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Value path (`$.a.b[0]`) or `#{now}`
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelConfig>,
    /// Missing values become null instead of failing the payload
    #[serde(default)]
    pub optional: bool,
}

/// Label attached to an extracted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub name: String,
    /// Literal value, or a value path when it starts with `$`
    pub value: String,
}

/// Timestamp precision for line protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePrecision {
    #[default]
    Ns,
    Us,
    Ms,
    S,
}

/// Options for `influxAuto`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InfluxAutoConfig {
    pub time_precision: TimePrecision,
}

/// Options for `jsonFrame` (none yet)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFrameConfig {}

// =============================================================================
// Processors
// =============================================================================

/// Processor selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorConfig {
    #[serde(rename = "type")]
    pub processor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_fields: Option<FieldNamesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_fields: Option<FieldNamesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<MultipleProcessorConfig>,
}

impl ProcessorConfig {
    /// `dropFields` processor
    pub fn drop_fields<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            drop_fields: Some(FieldNamesConfig::new(names)),
            ..Self::of_type("dropFields")
        }
    }

    /// `keepFields` processor
    pub fn keep_fields<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            keep_fields: Some(FieldNamesConfig::new(names)),
            ..Self::of_type("keepFields")
        }
    }

    /// `multiple` processor
    pub fn multiple(processors: Vec<ProcessorConfig>) -> Self {
        Self {
            multiple: Some(MultipleProcessorConfig { processors }),
            ..Self::of_type("multiple")
        }
    }

    /// Processor of the given type with no options
    pub fn of_type(processor_type: impl Into<String>) -> Self {
        Self {
            processor_type: processor_type.into(),
            drop_fields: None,
            keep_fields: None,
            multiple: None,
        }
    }
}

/// Field name list for `dropFields` / `keepFields`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldNamesConfig {
    pub field_names: Vec<String>,
}

impl FieldNamesConfig {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            field_names: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Children of a `multiple` processor, applied in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleProcessorConfig {
    pub processors: Vec<ProcessorConfig>,
}

// =============================================================================
// Conditions
// =============================================================================

/// Condition checker selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionCheckerConfig {
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_compare: Option<NumberCompareConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<MultipleConditionConfig>,
}

impl ConditionCheckerConfig {
    /// `numberCompare` condition
    pub fn number_compare(field_name: impl Into<String>, op: NumberCompareOp, value: f64) -> Self {
        Self {
            number_compare: Some(NumberCompareConfig {
                field_name: field_name.into(),
                op,
                value,
            }),
            ..Self::of_type("numberCompare")
        }
    }

    /// `multiple` condition
    pub fn multiple(kind: ConditionType, conditions: Vec<ConditionCheckerConfig>) -> Self {
        Self {
            multiple: Some(MultipleConditionConfig { kind, conditions }),
            ..Self::of_type("multiple")
        }
    }

    /// Condition of the given type with no options
    pub fn of_type(condition_type: impl Into<String>) -> Self {
        Self {
            condition_type: condition_type.into(),
            number_compare: None,
            multiple: None,
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberCompareOp {
    Gt,
    #[serde(alias = "gte")]
    Ge,
    Lt,
    #[serde(alias = "lte")]
    Le,
    Eq,
    Ne,
}

impl NumberCompareOp {
    /// Apply the operator: `value <op> threshold`
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }
}

/// Options for `numberCompare`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberCompareConfig {
    pub field_name: String,
    pub op: NumberCompareOp,
    pub value: f64,
}

/// How `multiple` combines its children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    #[default]
    And,
    Or,
}

/// Options for `multiple` conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleConditionConfig {
    #[serde(rename = "type")]
    pub kind: ConditionType,
    pub conditions: Vec<ConditionCheckerConfig>,
}

// =============================================================================
// Outputters
// =============================================================================

/// Outputter selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputterConfig {
    #[serde(rename = "type")]
    pub outputter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Box<ConditionalOutputConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<ThresholdOutputConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_write: Option<RemoteWriteOutputConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_log: Option<ChangeLogOutputConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<MultipleOutputterConfig>,
}

impl OutputterConfig {
    /// Outputter of the given type with no options
    pub fn of_type(outputter_type: impl Into<String>) -> Self {
        Self {
            outputter_type: outputter_type.into(),
            redirect: None,
            conditional: None,
            threshold: None,
            remote_write: None,
            change_log: None,
            multiple: None,
        }
    }

    /// `managedStream` outputter
    pub fn managed_stream() -> Self {
        Self::of_type("managedStream")
    }

    /// `localSubscribers` outputter
    pub fn local_subscribers() -> Self {
        Self::of_type("localSubscribers")
    }

    /// `redirect` outputter
    pub fn redirect(channel: impl Into<String>) -> Self {
        Self {
            redirect: Some(RedirectConfig {
                channel: channel.into(),
            }),
            ..Self::of_type("redirect")
        }
    }

    /// `conditional` outputter
    pub fn conditional(condition: ConditionCheckerConfig, output: OutputterConfig) -> Self {
        Self {
            conditional: Some(Box::new(ConditionalOutputConfig { condition, output })),
            ..Self::of_type("conditional")
        }
    }

    /// `threshold` outputter
    pub fn threshold(config: ThresholdOutputConfig) -> Self {
        Self {
            threshold: Some(config),
            ..Self::of_type("threshold")
        }
    }

    /// `remoteWrite` outputter
    pub fn remote_write(uid: impl Into<String>) -> Self {
        Self {
            remote_write: Some(RemoteWriteOutputConfig {
                uid: uid.into(),
                sample_milliseconds: 0,
            }),
            ..Self::of_type("remoteWrite")
        }
    }

    /// `changeLog` outputter
    pub fn change_log(field_name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            change_log: Some(ChangeLogOutputConfig {
                field_name: field_name.into(),
                channel: channel.into(),
            }),
            ..Self::of_type("changeLog")
        }
    }

    /// `multiple` outputter
    pub fn multiple(outputs: Vec<OutputterConfig>) -> Self {
        Self {
            multiple: Some(MultipleOutputterConfig { outputs }),
            ..Self::of_type("multiple")
        }
    }
}

/// Target channel template for `redirect`
///
/// `{name}` is replaced with a captured route parameter, `{frame}` with the
/// frame name and `{field:NAME}` with the latest value of field NAME.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectConfig {
    pub channel: String,
}

/// Options for `conditional`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOutputConfig {
    pub condition: ConditionCheckerConfig,
    pub output: OutputterConfig,
}

/// Options for `threshold`
///
/// A dimension that is not loaded becomes loaded when its value is above
/// `loading`; a loaded dimension stays loaded while its value is above
/// `unloading` (defaults to `loading`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdOutputConfig {
    pub field_name: String,
    pub loading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unloading: Option<f64>,
    /// Channel that receives transition events
    pub channel: String,
}

/// Options for `remoteWrite`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWriteOutputConfig {
    /// Backend UID, resolved when the rule is built
    pub uid: String,
    /// Minimum interval between writes, 0 writes every frame
    #[serde(default)]
    pub sample_milliseconds: u64,
}

/// Options for `changeLog`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogOutputConfig {
    pub field_name: String,
    /// Channel that receives change events
    pub channel: String,
}

/// Children of a `multiple` outputter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleOutputterConfig {
    pub outputs: Vec<OutputterConfig>,
}

// =============================================================================
// Subscribers and data outputters
// =============================================================================

/// Subscriber selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberConfig {
    #[serde(rename = "type")]
    pub subscriber_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<MultipleSubscriberConfig>,
}

impl SubscriberConfig {
    /// Subscriber of the given type with no options
    pub fn of_type(subscriber_type: impl Into<String>) -> Self {
        Self {
            subscriber_type: subscriber_type.into(),
            multiple: None,
        }
    }

    /// `multiple` subscriber
    pub fn multiple(subscribers: Vec<SubscriberConfig>) -> Self {
        Self {
            multiple: Some(MultipleSubscriberConfig { subscribers }),
            ..Self::of_type("multiple")
        }
    }
}

/// Children of a `multiple` subscriber
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleSubscriberConfig {
    pub subscribers: Vec<SubscriberConfig>,
}

/// Data outputter selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataOutputterConfig {
    #[serde(rename = "type")]
    pub data_outputter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectConfig>,
}

impl DataOutputterConfig {
    /// Data outputter of the given type with no options
    pub fn of_type(data_outputter_type: impl Into<String>) -> Self {
        Self {
            data_outputter_type: data_outputter_type.into(),
            redirect: None,
        }
    }

    /// `redirect` data outputter
    pub fn redirect(channel: impl Into<String>) -> Self {
        Self {
            redirect: Some(RedirectConfig {
                channel: channel.into(),
            }),
            ..Self::of_type("redirect")
        }
    }
}

// =============================================================================
// Remote write backends
// =============================================================================

/// Remote write target referenced by UID from `remoteWrite` outputters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWriteBackend {
    #[serde(default)]
    pub org_id: OrgId,
    pub uid: String,
    pub settings: RemoteWriteSettings,
}

/// Connection settings for a remote write backend
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWriteSettings {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for RemoteWriteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteWriteSettings")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

// =============================================================================
// Rule document
// =============================================================================

/// JSON document holding all rules and backends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesDocument {
    pub rules: Vec<ChannelRuleConfig>,
    pub remote_write_backends: Vec<RemoteWriteBackend>,
}

impl RulesDocument {
    /// Parse a rule document
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Load a rule document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_slice(&data)
    }

    /// Pretty JSON encoding
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Rules of one organization
    pub fn rules_for(&self, org_id: OrgId) -> impl Iterator<Item = &ChannelRuleConfig> {
        self.rules.iter().filter(move |r| r.org_id == org_id)
    }

    /// Remote write backends of one organization
    pub fn backends_for(&self, org_id: OrgId) -> impl Iterator<Item = &RemoteWriteBackend> {
        self.remote_write_backends
            .iter()
            .filter(move |b| b.org_id == org_id)
    }
}
