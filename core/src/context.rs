//! Execution-context documents fed to the helper process.
//!
//! The helper reads exactly one JSON document from stdin before it starts
//! executing the plugin. Field names are a wire contract: the helper
//! addresses them structurally, so the serde renames here must not change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A repository the job has access to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub alias: String,
    pub url: String,
}

/// A service endpoint forwarded to the plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Context for a task-mode invocation. Owned by the invocation that creates
/// it; serialized once, then discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub inputs: HashMap<String, String>,
    pub repositories: Vec<Repository>,
    pub endpoints: Vec<Endpoint>,
    /// Current step's execution target.
    pub container: Option<String>,
    pub job_settings: HashMap<String, String>,
    /// Job-scoped variables; callers may mutate these up until
    /// serialization.
    pub variables: HashMap<String, String>,
    pub task_variables: HashMap<String, String>,
}

impl TaskContext {
    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Context for a command-mode invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    pub data: String,
    pub properties: HashMap<String, String>,
    pub endpoints: Vec<Endpoint>,
    pub variables: HashMap<String, String>,
}

impl CommandContext {
    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
