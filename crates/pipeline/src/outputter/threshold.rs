//! Threshold outputter - load/unload transitions with hysteresis
//!
//! Each dimension (field name plus labels) is either loaded or unloaded.
//! An unloaded dimension loads once its value exceeds `loading`; a loaded
//! one stays loaded until its value drops to `unloading` or below.
//!
//! State lives in frame storage as two fingerprint frames per outputter and
//! channel, `<scope>/loaded` and `<scope>/seen`, so it survives across
//! publishes and is shared by all callers. The scope is unique per outputter
//! within a rule. `seen` is always locked before `loaded`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use live_config::OutputterConfig;
use live_frame::{
    Field, Frame, Labels, dimension_fingerprint, fingerprint_frame, fingerprints_from_frame,
};
use tracing::debug;

use super::{Outputter, missing};
use crate::Result;
use crate::builder::BuildContext;
use crate::context::{ChannelContext, ChannelFrame};
use crate::storage::{FrameKey, FrameStorage};
use crate::template::ChannelTemplate;

#[cfg(test)]
#[path = "threshold_test.rs"]
mod tests;

/// New state of a dimension given its previous state and value
#[inline]
pub fn evaluate_hysteresis(was_loaded: bool, value: f64, loading: f64, unloading: f64) -> bool {
    if was_loaded {
        value > unloading
    } else {
        value > loading
    }
}

/// State change of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Index into the evaluated dimensions
    pub index: usize,
    pub loaded: bool,
}

/// Threshold state of one outputter on one channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdState {
    /// Dimensions currently loaded
    pub loaded: HashSet<u64>,
    /// Every dimension evaluated so far
    pub seen: HashSet<u64>,
}

/// Evaluate dimensions and update `state` in place
///
/// Returns the state changes. A dimension evaluated for the first time
/// always reports its state. Dimensions absent from `values` keep theirs.
pub fn evaluate_transitions(
    state: &mut ThresholdState,
    values: &[(u64, f64)],
    loading: f64,
    unloading: f64,
) -> Vec<Transition> {
    let mut transitions = Vec::new();

    for (index, &(fingerprint, value)) in values.iter().enumerate() {
        let was_loaded = state.loaded.contains(&fingerprint);
        let now_loaded = evaluate_hysteresis(was_loaded, value, loading, unloading);
        if now_loaded {
            state.loaded.insert(fingerprint);
        } else {
            state.loaded.remove(&fingerprint);
        }
        let first = state.seen.insert(fingerprint);
        if first || now_loaded != was_loaded {
            transitions.push(Transition {
                index,
                loaded: now_loaded,
            });
        }
    }
    transitions
}

/// Emits a frame per dimension whose load state changed
pub struct ThresholdOutputter {
    scope: String,
    field_name: String,
    loading: f64,
    unloading: f64,
    channel: ChannelTemplate,
    storage: Arc<FrameStorage>,
}

impl ThresholdOutputter {
    /// `scope` names this outputter's state; see [`BuildContext::state_scope`]
    pub fn new(
        scope: impl Into<String>,
        field_name: impl Into<String>,
        loading: f64,
        unloading: f64,
        channel: ChannelTemplate,
        storage: Arc<FrameStorage>,
    ) -> Self {
        Self {
            scope: scope.into(),
            field_name: field_name.into(),
            loading,
            unloading,
            channel,
            storage,
        }
    }

    pub fn from_config(
        config: &OutputterConfig,
        ctx: &BuildContext<'_>,
        _depth: usize,
    ) -> Result<Box<dyn Outputter>> {
        let threshold = config.threshold.as_ref().ok_or_else(|| missing("threshold"))?;
        Ok(Box::new(Self::new(
            ctx.state_scope("threshold", &threshold.field_name),
            &threshold.field_name,
            threshold.loading,
            threshold.unloading.unwrap_or(threshold.loading),
            ChannelTemplate::parse(&threshold.channel)?,
            Arc::clone(&ctx.services().storage),
        )))
    }

    fn state_key(&self, ctx: &ChannelContext<'_>, part: &str) -> FrameKey {
        FrameKey::new(ctx.org_id, ctx.channel, format!("{}/{}", self.scope, part))
    }

    fn event_frame(&self, source: &Frame, value: f64, labels: &Labels, loaded: bool) -> Result<Frame> {
        Ok(Frame::from_fields(
            source.name(),
            vec![
                Field::time("time", vec![Utc::now()]),
                Field::float64("value", vec![value]).with_labels(labels.clone()),
                Field::int64("loaded", vec![i64::from(loaded)]),
            ],
        )?)
    }
}

fn read_fingerprints(stored: Option<&Frame>) -> Result<HashSet<u64>> {
    Ok(stored
        .map(fingerprints_from_frame)
        .transpose()?
        .unwrap_or_default())
}

#[async_trait]
impl Outputter for ThresholdOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        let dimensions: Vec<(&Field, u64, f64)> = frame
            .fields_named(&self.field_name)
            .filter_map(|field| {
                let value = field.latest_f64()?;
                Some((field, dimension_fingerprint(field.name(), field.labels()), value))
            })
            .collect();
        if dimensions.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<(u64, f64)> = dimensions.iter().map(|&(_, fp, v)| (fp, v)).collect();
        let transitions = self.storage.update(&self.state_key(ctx, "seen"), |seen| {
            let mut state = ThresholdState {
                loaded: HashSet::new(),
                seen: read_fingerprints(seen)?,
            };
            let transitions = self.storage.update(&self.state_key(ctx, "loaded"), |loaded| {
                state.loaded = read_fingerprints(loaded)?;
                let transitions =
                    evaluate_transitions(&mut state, &values, self.loading, self.unloading);
                Ok((fingerprint_frame(&self.field_name, &state.loaded), transitions))
            })?;
            Ok((fingerprint_frame(&self.field_name, &state.seen), transitions))
        })?;

        let mut output = Vec::with_capacity(transitions.len());
        for transition in transitions {
            let (field, _, value) = dimensions[transition.index];
            let event = self.event_frame(frame, value, field.labels(), transition.loaded)?;
            let channel = self.channel.render(ctx.params, Some(&event))?;
            debug!(
                org_id = ctx.org_id,
                channel = ctx.channel,
                field = %self.field_name,
                loaded = transition.loaded,
                value,
                "threshold transition"
            );
            output.push(ChannelFrame::new(channel, event));
        }
        Ok(output)
    }

    fn type_name(&self) -> &'static str {
        "threshold"
    }
}
