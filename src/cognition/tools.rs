//! Tool descriptors - what an agent may ask the runtime to do
//!
//! Each tool carries a validator for its parameters. The pipeline only
//! decides to request an action; executing it is up to the runtime.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::decode::{FieldRule, RecordSchema, Validator};

/// Raw parameters of a requested action
pub type ToolParameters = Map<String, Value>;

#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<String>,
    pub schema: Arc<dyn Validator<ToolParameters>>,
}

impl ToolDescriptor {
    /// Descriptor whose parameter list is taken from the schema's fields
    pub fn new(name: impl Into<String>, description: impl Into<String>, schema: RecordSchema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: schema.field_names(),
            schema: Arc::new(schema),
        }
    }

    pub fn with_validator(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<String>,
        schema: Arc<dyn Validator<ToolParameters>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            schema,
        }
    }

    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Prompt-facing view of a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub parameters: Vec<String>,
}

/// A tool invocation requested by the oracle
///
/// Parameters stay as the oracle sent them; only registered tools check them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAction {
    pub tool: String,
    #[serde(default)]
    pub parameters: Value,
}

/// `name: description`, one tool per line
pub fn tool_list(tools: &[ToolDescriptor]) -> String {
    tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map of tool name → parameter schema description
pub fn tool_schemas(tools: &[ToolDescriptor]) -> Value {
    Value::Object(
        tools
            .iter()
            .map(|t| (t.name.clone(), t.schema.describe()))
            .collect(),
    )
}

pub fn find_tool<'a>(tools: &'a [ToolDescriptor], name: &str) -> Option<&'a ToolDescriptor> {
    tools.iter().find(|t| t.name == name)
}

/// Tools every agent gets unless the runtime supplies its own
pub fn default_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "speak",
            "Say something out loud to whoever is nearby",
            RecordSchema::new().required("message", FieldRule::NonEmptyText),
        ),
        ToolDescriptor::new(
            "move_to",
            "Walk to a position in the world",
            RecordSchema::new()
                .required("x", FieldRule::Number)
                .required("y", FieldRule::Number),
        ),
        ToolDescriptor::new(
            "give",
            "Hand an item from your inventory to someone",
            RecordSchema::new()
                .required("item", FieldRule::NonEmptyText)
                .required("recipient", FieldRule::NonEmptyText),
        ),
    ]
}
