//! `jsonFrame` - payload is already a frame document (or an array of them)

use live_config::ConverterConfig;
use live_frame::Frame;
use serde_json::Value as Json;

use super::Converter;
use crate::{TransformError, TransformResult};

/// Converter for `jsonFrame`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrameConverter;

impl JsonFrameConverter {
    /// Factory function registered as `jsonFrame`
    pub fn from_config(_config: &ConverterConfig) -> TransformResult<Box<dyn Converter>> {
        Ok(Box::new(Self))
    }
}

impl Converter for JsonFrameConverter {
    fn convert(&self, _channel: &str, payload: &[u8]) -> TransformResult<Vec<Frame>> {
        let json: Json = serde_json::from_slice(payload)?;
        let docs = match json {
            Json::Array(items) => items,
            obj @ Json::Object(_) => vec![obj],
            other => {
                return Err(TransformError::decode(format!(
                    "expected a frame object or array of frames, got {other}"
                )));
            }
        };

        docs.into_iter()
            .enumerate()
            .map(|(i, doc)| {
                Frame::from_json(doc)
                    .map_err(|e| TransformError::decode(format!("frame {i}: {e}")))
            })
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "jsonFrame"
    }
}
