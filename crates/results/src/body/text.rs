use crate::core::sanitize::{SafeStr, TextSanitizer};
use serde_json::Value;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Appends `segment` on a new line, or starts the text when there is none yet.
pub(crate) fn append_segment(existing: &mut Option<String>, segment: String) {
    match existing {
        Some(text) if !text.is_empty() => {
            text.push('\n');
            text.push_str(&segment);
        }
        _ => *existing = Some(segment),
    }
}

pub(crate) fn concat_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts.into_iter().fold(String::new(), |mut joined, part| {
        joined.push_str(part.as_ref());
        joined
    })
}

pub(crate) fn join_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| line.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Newline-joined free text.
#[derive(Clone)]
pub struct TextBody {
    data: Option<String>,
    sanitizer: Arc<dyn TextSanitizer>,
}

impl Default for TextBody {
    fn default() -> Self {
        Self::with_sanitizer(Arc::new(SafeStr))
    }
}

impl TextBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding the body to a typed section replaces `sanitizer` with the
    /// section context's one for lines added afterwards.
    pub fn with_sanitizer(sanitizer: Arc<dyn TextSanitizer>) -> Self {
        Self {
            data: None,
            sanitizer,
        }
    }

    pub(crate) fn bind_sanitizer(&mut self, sanitizer: Arc<dyn TextSanitizer>) {
        self.sanitizer = sanitizer;
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.data = Some(text.into());
        self
    }

    pub fn add_line(&mut self, text: &str) {
        let line = self.sanitizer.safe(text);
        append_segment(&mut self.data, line);
    }

    /// Adds one line made of `parts` concatenated without a separator.
    pub fn add_line_parts<I, S>(&mut self, parts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = concat_parts(parts);
        self.add_line(&line);
    }

    /// Adds each item as its own line.
    pub fn add_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segment = self.sanitizer.safe(&join_lines(lines));
        append_segment(&mut self.data, segment);
    }

    pub fn text(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub(crate) fn payload(&self) -> Value {
        match &self.data {
            Some(text) => Value::String(text.clone()),
            None => Value::Null,
        }
    }
}

impl fmt::Debug for TextBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBody")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// Raw memory dump text. Shares every text mutator.
#[derive(Debug, Clone, Default)]
pub struct MemoryDumpBody(TextBody);

impl MemoryDumpBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sanitizer(sanitizer: Arc<dyn TextSanitizer>) -> Self {
        Self(TextBody::with_sanitizer(sanitizer))
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        Self(self.0.with_text(text))
    }
}

impl Deref for MemoryDumpBody {
    type Target = TextBody;

    fn deref(&self) -> &TextBody {
        &self.0
    }
}

impl DerefMut for MemoryDumpBody {
    fn deref_mut(&mut self) -> &mut TextBody {
        &mut self.0
    }
}
