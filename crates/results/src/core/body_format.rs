use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag telling downstream renderers how to interpret a section body.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyFormat {
    #[default]
    Text,
    MemoryDump,
    GraphData,
    Url,
    Json,
    KeyValue,
    ProcessTree,
    Table,
    Image,
    Multi,
}

impl BodyFormat {
    pub const ALL: [BodyFormat; 10] = [
        Self::Text,
        Self::MemoryDump,
        Self::GraphData,
        Self::Url,
        Self::Json,
        Self::KeyValue,
        Self::ProcessTree,
        Self::Table,
        Self::Image,
        Self::Multi,
    ];

    /// Stable numeric code shared with the rendering platform.
    pub fn code(&self) -> u8 {
        match self {
            Self::Text => 0,
            Self::MemoryDump => 1,
            Self::GraphData => 2,
            Self::Url => 3,
            Self::Json => 4,
            Self::KeyValue => 5,
            Self::ProcessTree => 6,
            Self::Table => 7,
            Self::Image => 8,
            Self::Multi => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::MemoryDump => "MEMORY_DUMP",
            Self::GraphData => "GRAPH_DATA",
            Self::Url => "URL",
            Self::Json => "JSON",
            Self::KeyValue => "KEY_VALUE",
            Self::ProcessTree => "PROCESS_TREE",
            Self::Table => "TABLE",
            Self::Image => "IMAGE",
            Self::Multi => "MULTI",
        }
    }
}

impl fmt::Display for BodyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_sequential() {
        for (idx, format) in BodyFormat::ALL.iter().enumerate() {
            assert_eq!(format.code() as usize, idx);
        }
    }

    #[test]
    fn test_serialized_name_matches_display() {
        for format in BodyFormat::ALL {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format));
        }
    }
}
