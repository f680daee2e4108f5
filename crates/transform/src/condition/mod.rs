//! Condition checkers - frame to bool
//!
//! Conditions look at the latest known (last non-null) value of a field.
//! A missing field, an empty frame or a non-numeric value evaluates to
//! `false`; checkers never error at evaluation time.

use live_config::{ConditionCheckerConfig, ConditionType, NumberCompareOp};
use live_frame::Frame;

use crate::registry::{Registry, check_depth};
use crate::{TransformError, TransformResult};

#[cfg(test)]
#[path = "condition_test.rs"]
mod tests;

/// Boolean predicate over a frame
pub trait ConditionChecker: Send + Sync {
    fn check(&self, frame: &Frame) -> bool;

    /// Type name for logging
    fn type_name(&self) -> &'static str;
}

/// Builds a condition checker from its config
pub trait ConditionFactory: Send + Sync {
    fn create(
        &self,
        config: &ConditionCheckerConfig,
        registry: &ConditionRegistry,
        depth: usize,
    ) -> TransformResult<Box<dyn ConditionChecker>>;
}

impl<T> ConditionFactory for T
where
    T: Fn(
            &ConditionCheckerConfig,
            &ConditionRegistry,
            usize,
        ) -> TransformResult<Box<dyn ConditionChecker>>
        + Send
        + Sync,
{
    fn create(
        &self,
        config: &ConditionCheckerConfig,
        registry: &ConditionRegistry,
        depth: usize,
    ) -> TransformResult<Box<dyn ConditionChecker>> {
        self(config, registry, depth)
    }
}

/// Registry of condition factories
pub type ConditionRegistry = Registry<dyn ConditionFactory>;

impl Registry<dyn ConditionFactory> {
    /// Build the checker a top-level config selects
    pub fn build(&self, config: &ConditionCheckerConfig) -> TransformResult<Box<dyn ConditionChecker>> {
        self.build_nested(config, 0)
    }

    /// Build a checker nested `depth` levels deep
    pub fn build_nested(
        &self,
        config: &ConditionCheckerConfig,
        depth: usize,
    ) -> TransformResult<Box<dyn ConditionChecker>> {
        check_depth(self.component(), depth)?;
        self.get(&config.condition_type)?
            .create(config, self, depth)
    }
}

/// Registry with all built-in condition checkers
pub fn default_condition_registry() -> ConditionRegistry {
    let mut registry = ConditionRegistry::new("condition");
    registry.register("numberCompare", Box::new(NumberCompareCondition::from_config));
    registry.register("multiple", Box::new(MultipleCondition::from_config));
    registry
}

// =============================================================================
// numberCompare
// =============================================================================

/// Compares the latest value of a field against a threshold
#[derive(Debug, Clone)]
pub struct NumberCompareCondition {
    field_name: String,
    op: NumberCompareOp,
    value: f64,
}

impl NumberCompareCondition {
    pub fn new(field_name: impl Into<String>, op: NumberCompareOp, value: f64) -> Self {
        Self {
            field_name: field_name.into(),
            op,
            value,
        }
    }

    /// Factory function registered as `numberCompare`
    pub fn from_config(
        config: &ConditionCheckerConfig,
        _registry: &ConditionRegistry,
        _depth: usize,
    ) -> TransformResult<Box<dyn ConditionChecker>> {
        let compare = config
            .number_compare
            .as_ref()
            .ok_or_else(|| TransformError::missing_settings("condition", "numberCompare"))?;
        Ok(Box::new(Self::new(
            compare.field_name.clone(),
            compare.op,
            compare.value,
        )))
    }
}

impl ConditionChecker for NumberCompareCondition {
    fn check(&self, frame: &Frame) -> bool {
        frame
            .field(&self.field_name)
            .and_then(|f| f.latest_f64())
            .is_some_and(|v| self.op.compare(v, self.value))
    }

    fn type_name(&self) -> &'static str {
        "numberCompare"
    }
}

// =============================================================================
// multiple
// =============================================================================

/// AND / OR over child conditions
///
/// An empty AND is true, an empty OR is false.
pub struct MultipleCondition {
    kind: ConditionType,
    conditions: Vec<Box<dyn ConditionChecker>>,
}

impl MultipleCondition {
    pub fn new(kind: ConditionType, conditions: Vec<Box<dyn ConditionChecker>>) -> Self {
        Self { kind, conditions }
    }

    /// Factory function registered as `multiple`
    pub fn from_config(
        config: &ConditionCheckerConfig,
        registry: &ConditionRegistry,
        depth: usize,
    ) -> TransformResult<Box<dyn ConditionChecker>> {
        let multiple = config
            .multiple
            .as_ref()
            .ok_or_else(|| TransformError::missing_settings("condition", "multiple"))?;
        let conditions = multiple
            .conditions
            .iter()
            .map(|child| registry.build_nested(child, depth + 1))
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(Box::new(Self::new(multiple.kind, conditions)))
    }
}

impl ConditionChecker for MultipleCondition {
    fn check(&self, frame: &Frame) -> bool {
        match self.kind {
            ConditionType::And => self.conditions.iter().all(|c| c.check(frame)),
            ConditionType::Or => self.conditions.iter().any(|c| c.check(frame)),
        }
    }

    fn type_name(&self) -> &'static str {
        "multiple"
    }
}
