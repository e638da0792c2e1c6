use crate::table::{TableFrame, TableRenderer};
use serde_json::{json, Value};

/// Captures the last frame drawn as the JSON the shell receives.
#[derive(Debug, Default)]
pub struct JsonRenderer {
    last: Option<Value>,
}

impl TableRenderer for JsonRenderer {
    fn render(&mut self, frame: &TableFrame) {
        match serde_json::to_value(frame) {
            Ok(v) => self.last = Some(v),
            Err(e) => tracing::error!(error = %e, "frame serialization failed"),
        }
    }
}

impl JsonRenderer {
    pub fn into_response(self) -> Value {
        match self.last {
            Some(frame) => json!({ "rendered": true, "frame": frame }),
            None => not_rendered(),
        }
    }
}

pub fn not_rendered() -> Value {
    json!({ "rendered": false })
}
