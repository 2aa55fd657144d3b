use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One process in a process tree; owns its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessItem {
    pub pid: i64,
    pub name: String,
    pub cmd: String,

    #[serde(default)]
    pub signatures: BTreeMap<String, i64>,

    #[serde(default)]
    pub children: Vec<ProcessItem>,
}

impl ProcessItem {
    pub fn new(pid: i64, name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmd: cmd.into(),
            signatures: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_signatures(mut self, signatures: BTreeMap<String, i64>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn with_child(mut self, child: ProcessItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_signature(&mut self, name: impl Into<String>, score: i64) {
        self.signatures.insert(name.into(), score);
    }

    pub fn add_child_process(&mut self, process: ProcessItem) {
        self.children.push(process);
    }

    /// Wire form consumed by the process-tree renderer.
    pub fn as_primitives(&self) -> Value {
        json!({
            "process_pid": self.pid,
            "process_name": self.name,
            "command_line": self.cmd,
            "signatures": self.signatures,
            "children": self.children.iter().map(ProcessItem::as_primitives).collect::<Vec<_>>(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessTreeBody {
    processes: Vec<Value>,
}

impl ProcessTreeBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a snapshot of `process` and its descendants.
    pub fn add_process(&mut self, process: &ProcessItem) {
        self.processes.push(process.as_primitives());
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub(crate) fn payload(&self) -> Value {
        Value::Array(self.processes.clone())
    }
}
