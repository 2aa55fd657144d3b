//! Typed section bodies
//!
//! `SectionBody` is a closed set of payload shapes. Each variant wraps its own
//! payload struct, and the mutators live on those structs, so a caller holding
//! a `KeyValueBody` can only call key-value mutators. The `BodyVariant` trait
//! recovers the concrete struct from a `SectionBody` for typed sections.
//!
//! Every body renders the same way: `None` when the payload is empty or
//! falsy, the raw text when the payload is a string, otherwise the payload
//! encoded as JSON.

pub mod image;
pub mod multi;
pub mod process;
pub mod structured;
pub mod text;

pub use image::{AttachmentRegistrar, ImageBody};
pub use multi::MultiBody;
pub use process::{ProcessItem, ProcessTreeBody};
pub use structured::{GraphBody, JsonBody, KeyValueBody, KvValue, TableBody, TableRow, UrlBody, UrlEntry};
pub use text::{MemoryDumpBody, TextBody};

use crate::core::BodyFormat;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use std::io;

#[derive(Debug, Clone)]
pub enum SectionBody {
    Text(TextBody),
    MemoryDump(MemoryDumpBody),
    Graph(GraphBody),
    Url(UrlBody),
    KeyValue(KeyValueBody),
    Json(JsonBody),
    ProcessTree(ProcessTreeBody),
    Table(TableBody),
    Image(ImageBody),
    Multi(MultiBody),
}

impl SectionBody {
    pub fn format(&self) -> BodyFormat {
        match self {
            Self::Text(_) => BodyFormat::Text,
            Self::MemoryDump(_) => BodyFormat::MemoryDump,
            Self::Graph(_) => BodyFormat::GraphData,
            Self::Url(_) => BodyFormat::Url,
            Self::KeyValue(_) => BodyFormat::KeyValue,
            Self::Json(_) => BodyFormat::Json,
            Self::ProcessTree(_) => BodyFormat::ProcessTree,
            Self::Table(_) => BodyFormat::Table,
            Self::Image(_) => BodyFormat::Image,
            Self::Multi(_) => BodyFormat::Multi,
        }
    }

    /// The payload before rendering.
    pub fn payload(&self) -> Value {
        match self {
            Self::Text(body) => body.payload(),
            Self::MemoryDump(body) => body.payload(),
            Self::Graph(body) => body.payload(),
            Self::Url(body) => body.payload(),
            Self::KeyValue(body) => body.payload(),
            Self::Json(body) => body.payload(),
            Self::ProcessTree(body) => body.payload(),
            Self::Table(body) => body.payload(),
            Self::Image(body) => body.payload(),
            Self::Multi(body) => body.payload(),
        }
    }

    pub fn render(&self) -> Option<String> {
        render_payload(&self.payload())
    }
}

/// Access to one concrete body type inside a `SectionBody`.
pub trait BodyVariant: Into<SectionBody> + 'static {
    const FORMAT: BodyFormat;

    fn from_body(body: &SectionBody) -> Option<&Self>;

    fn from_body_mut(body: &mut SectionBody) -> Option<&mut Self>;
}

macro_rules! body_variant {
    ($body:ty, $variant:ident, $format:expr) => {
        impl From<$body> for SectionBody {
            fn from(body: $body) -> Self {
                SectionBody::$variant(body)
            }
        }

        impl BodyVariant for $body {
            const FORMAT: BodyFormat = $format;

            fn from_body(body: &SectionBody) -> Option<&Self> {
                match body {
                    SectionBody::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_body_mut(body: &mut SectionBody) -> Option<&mut Self> {
                match body {
                    SectionBody::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

body_variant!(TextBody, Text, BodyFormat::Text);
body_variant!(MemoryDumpBody, MemoryDump, BodyFormat::MemoryDump);
body_variant!(GraphBody, Graph, BodyFormat::GraphData);
body_variant!(UrlBody, Url, BodyFormat::Url);
body_variant!(KeyValueBody, KeyValue, BodyFormat::KeyValue);
body_variant!(JsonBody, Json, BodyFormat::Json);
body_variant!(ProcessTreeBody, ProcessTree, BodyFormat::ProcessTree);
body_variant!(TableBody, Table, BodyFormat::Table);
body_variant!(ImageBody, Image, BodyFormat::Image);
body_variant!(MultiBody, Multi, BodyFormat::Multi);

pub(crate) fn is_falsy(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

pub fn render_payload(payload: &Value) -> Option<String> {
    if is_falsy(payload) {
        return None;
    }

    match payload {
        Value::String(text) => Some(text.clone()),
        structured => Some(encode_json(structured)),
    }
}

/// Writes `", "` between items and `": "` after keys, the separators the
/// rendering platform has always received.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn encode_json(payload: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, SpacedFormatter);
    match payload.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| payload.to_string()),
        Err(_) => payload.to_string(),
    }
}
