use std::collections::HashMap;

use anyhow::Result;

use super::interpolate;

/// A unit of work assigned to one agent of the crew.
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
    /// Index into the crew's agent list.
    pub agent: usize,
}

#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub agent: String,
    pub raw: String,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: usize,
    ) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
        }
    }

    pub(crate) fn interpolated(&self, inputs: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            description: interpolate(&self.description, inputs)?,
            expected_output: interpolate(&self.expected_output, inputs)?,
            agent: self.agent,
        })
    }

    /// Builds the user prompt, with outputs of earlier tasks as context.
    pub(crate) fn prompt(&self, context: &[TaskOutput]) -> String {
        let mut prompt = format!(
            "{}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            self.description, self.expected_output
        );

        if !context.is_empty() {
            let joined = context
                .iter()
                .map(|o| o.raw.as_str())
                .collect::<Vec<_>>()
                .join("\n\n----------\n\n");
            prompt.push_str("\n\nThis is the context you're working with:\n");
            prompt.push_str(&joined);
        }

        prompt
    }
}
