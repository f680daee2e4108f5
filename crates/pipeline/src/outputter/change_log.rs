//! Change log outputter - emit previous/current when a value changes

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use live_config::OutputterConfig;
use live_frame::{Field, Frame, Value};

use super::{Outputter, missing};
use crate::Result;
use crate::builder::BuildContext;
use crate::context::{ChannelContext, ChannelFrame};
use crate::storage::{FrameKey, FrameStorage};
use crate::template::ChannelTemplate;

/// Tracks the latest value of one field per channel
///
/// The first value seen is reported with a null `previous`. Frames without
/// the field, or where it holds only nulls, are ignored. The last value is
/// stored under this outputter's own scope.
pub struct ChangeLogOutputter {
    scope: String,
    field_name: String,
    channel: ChannelTemplate,
    storage: Arc<FrameStorage>,
}

impl ChangeLogOutputter {
    pub fn new(
        scope: impl Into<String>,
        field_name: impl Into<String>,
        channel: ChannelTemplate,
        storage: Arc<FrameStorage>,
    ) -> Self {
        Self {
            scope: scope.into(),
            field_name: field_name.into(),
            channel,
            storage,
        }
    }

    pub fn from_config(
        config: &OutputterConfig,
        ctx: &BuildContext<'_>,
        _depth: usize,
    ) -> Result<Box<dyn Outputter>> {
        let change_log = config.change_log.as_ref().ok_or_else(|| missing("changeLog"))?;
        Ok(Box::new(Self::new(
            ctx.state_scope("changeLog", &change_log.field_name),
            &change_log.field_name,
            ChannelTemplate::parse(&change_log.channel)?,
            Arc::clone(&ctx.services().storage),
        )))
    }
}

#[async_trait]
impl Outputter for ChangeLogOutputter {
    async fn output(&self, ctx: &ChannelContext<'_>, frame: &Frame) -> Result<Vec<ChannelFrame>> {
        let Some(field) = frame.field(&self.field_name) else {
            return Ok(Vec::new());
        };
        let Some(current) = field.latest().cloned() else {
            return Ok(Vec::new());
        };
        let field_type = field.field_type();

        let snapshot = Frame::from_field(
            frame.name(),
            Field::from_values(&self.field_name, field_type, false, vec![current.clone()])?,
        );
        let key = FrameKey::new(ctx.org_id, ctx.channel, self.scope.as_str());
        let previous = self.storage.update(&key, |stored| {
            let previous = stored
                .and_then(|f| f.fields().first())
                .and_then(|f| f.latest())
                .cloned();
            Ok((snapshot, previous))
        })?;

        if previous.as_ref() == Some(&current) {
            return Ok(Vec::new());
        }

        // A stored value of another type (the field changed type) reads as null.
        let previous = previous
            .filter(|v| v.field_type() == Some(field_type))
            .unwrap_or(Value::Null);
        let event = Frame::from_fields(
            frame.name(),
            vec![
                Field::time("time", vec![Utc::now()]),
                Field::from_values("previous", field_type, true, vec![previous])?,
                Field::from_values("current", field_type, false, vec![current])?
                    .with_labels(field.labels().clone()),
            ],
        )?;
        let channel = self.channel.render(ctx.params, Some(&event))?;
        Ok(vec![ChannelFrame::new(channel, event)])
    }

    fn type_name(&self) -> &'static str {
        "changeLog"
    }
}
