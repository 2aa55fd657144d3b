use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default)]
pub struct GraphBody {
    data: Option<Value>,
}

impl GraphBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_colormap(&mut self, cmap_min: i64, cmap_max: i64, values: Vec<i64>) {
        self.data = Some(json!({
            "type": "colormap",
            "data": {
                "domain": [cmap_min, cmap_max],
                "values": values,
            }
        }));
    }

    pub(crate) fn payload(&self) -> Value {
        self.data.clone().unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UrlBody {
    urls: Vec<UrlEntry>,
}

impl UrlBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_url(&mut self, url: impl Into<String>, name: Option<&str>) {
        self.urls.push(UrlEntry {
            url: url.into(),
            name: name.filter(|n| !n.is_empty()).map(str::to_string),
        });
    }

    pub fn urls(&self) -> &[UrlEntry] {
        &self.urls
    }

    pub(crate) fn payload(&self) -> Value {
        serde_json::to_value(&self.urls).unwrap_or(Value::Null)
    }
}

/// Value types a key-value body accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KvValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&str> for KvValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KvValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for KvValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for KvValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for KvValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for KvValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl TryFrom<Value> for KvValue {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::String(s) => Ok(Self::Str(s)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => Err(Value::Number(n)),
            },
            other => Err(other),
        }
    }
}

impl From<KvValue> for Value {
    fn from(value: KvValue) -> Self {
        match value {
            KvValue::Bool(b) => Value::Bool(b),
            KvValue::Int(i) => Value::from(i),
            KvValue::Str(s) => Value::String(s),
        }
    }
}

/// Unique string keys mapped to scalar values, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct KeyValueBody {
    items: Map<String, Value>,
}

impl KeyValueBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<KvValue>,
    {
        let mut body = Self::new();
        body.update_items(items);
        body
    }

    pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<KvValue>) {
        self.items.insert(key.into(), value.into().into());
    }

    pub fn update_items<I, K, V>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<KvValue>,
    {
        for (key, value) in items {
            self.set_item(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn payload(&self) -> Value {
        Value::Object(self.items.clone())
    }
}

/// Arbitrary JSON, an empty object until set.
#[derive(Debug, Clone)]
pub struct JsonBody {
    data: Value,
}

impl Default for JsonBody {
    fn default() -> Self {
        Self {
            data: Value::Object(Map::new()),
        }
    }
}

impl JsonBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_json(&mut self, value: Value) {
        self.data = value;
    }

    /// Shallow merge: top-level keys of `partial` overwrite existing ones.
    /// A body currently holding a non-object value is replaced by `partial`.
    pub fn update_json(&mut self, partial: Map<String, Value>) {
        match &mut self.data {
            Value::Object(current) => current.extend(partial),
            other => *other = Value::Object(partial),
        }
    }

    pub fn json(&self) -> &Value {
        &self.data
    }

    pub(crate) fn payload(&self) -> Value {
        self.data.clone()
    }
}

/// One row of a table body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableRow(Map<String, Value>);

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TableRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableBody {
    rows: Vec<TableRow>,
}

impl TableBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub(crate) fn payload(&self) -> Value {
        Value::Array(self.rows.iter().map(|row| Value::Object(row.0.clone())).collect())
    }
}
