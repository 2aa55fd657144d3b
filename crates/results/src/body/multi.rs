use crate::body::SectionBody;
use crate::core::BodyFormat;
use serde_json::{json, Value};

/// Composite of other bodies, each kept as its format and raw payload.
#[derive(Debug, Clone, Default)]
pub struct MultiBody {
    parts: Vec<(BodyFormat, Value)>,
}

impl MultiBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot of `body`; later changes to `body` are not seen.
    pub fn add_section_body(&mut self, body: &SectionBody) {
        self.parts.push((body.format(), body.payload()));
    }

    pub fn parts(&self) -> &[(BodyFormat, Value)] {
        &self.parts
    }

    pub(crate) fn payload(&self) -> Value {
        Value::Array(
            self.parts
                .iter()
                .map(|(format, payload)| json!([format, payload]))
                .collect(),
        )
    }
}
