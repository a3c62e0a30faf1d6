use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use super::interpolate;
use super::llm::{ChatMessage, CompletionRequest, LlmClient, ToolCall};
use crate::tools::{Tool, ToolDefinition};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// A role-playing LLM worker with a fixed persona and a set of tools.
#[derive(Clone)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    tools: Vec<Arc<dyn Tool>>,
    llm: Arc<dyn LlmClient>,
    max_iterations: usize,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            llm,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Returns a copy with `{name}` placeholders in the persona filled from `inputs`.
    pub(crate) fn interpolated(&self, inputs: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            role: interpolate(&self.role, inputs)?,
            goal: interpolate(&self.goal, inputs)?,
            backstory: interpolate(&self.backstory, inputs)?,
            ..self.clone()
        })
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    /// Runs the tool-calling loop until the model answers without calling a tool.
    pub(crate) async fn execute(&self, prompt: String) -> Result<String> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(prompt),
        ];
        let tools = self.tool_definitions();

        for iteration in 0..self.max_iterations {
            debug!("Agent '{}' iteration {}", self.role, iteration);

            let response = self
                .llm
                .complete(CompletionRequest {
                    messages: messages.clone(),
                    tools: tools.clone(),
                })
                .await?;

            if response.tool_calls.is_empty() {
                info!(
                    "Agent '{}' finished after {} iterations",
                    self.role,
                    iteration + 1
                );
                return Ok(response.content);
            }

            messages.push(ChatMessage::assistant(
                response.content,
                response.tool_calls.clone(),
            ));

            for tool_call in response.tool_calls {
                let result = self.run_tool(&tool_call).await;
                messages.push(ChatMessage::tool_result(tool_call.id, result));
            }
        }

        Err(anyhow!(
            "Agent '{}' exceeded maximum iterations ({})",
            self.role,
            self.max_iterations
        ))
    }

    async fn run_tool(&self, tool_call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == tool_call.name) else {
            warn!("Agent '{}' requested unknown tool: {}", self.role, tool_call.name);
            return format!("Error: Unknown tool: {}", tool_call.name);
        };

        info!("Agent '{}' calling tool {}", self.role, tool_call.name);

        let tool = Arc::clone(tool);
        let arguments = Some(tool_call.arguments.clone());
        // Tools do blocking file and parser work.
        match tokio::task::spawn_blocking(move || tool.call(arguments)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool {} did not complete: {}", tool_call.name, e);
                format!("Error: Tool {} failed: {}", tool_call.name, e)
            }
        }
    }
}
