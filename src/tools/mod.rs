use serde::{Deserialize, Serialize};

pub mod read_data_tool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// A capability an agent can call by name.
///
/// Tools never fail across this boundary: every outcome, including bad
/// arguments, comes back as text the model can read and reason about.
pub trait Tool: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    /// Runs the tool with the raw JSON arguments emitted by the model.
    fn call(&self, arguments: Option<serde_json::Value>) -> String;

    fn name(&self) -> &str {
        &self.definition().name
    }
}
