//! A small sequential multi-agent runner.
//!
//! A [`Crew`] owns an ordered list of agents and an ordered list of tasks.
//! `kickoff` fills `{placeholders}` in every agent and task from the given
//! inputs and then runs the tasks one after another, each task seeing the
//! outputs of the tasks before it.

use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

pub mod agent;
pub mod definitions;
pub mod llm;
pub mod openai;
pub mod task;

pub use agent::Agent;
pub use task::{Task, TaskOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Process {
    Sequential,
}

#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone)]
pub struct Crew {
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    process: Process,
}

impl Crew {
    pub fn new(agents: Vec<Agent>, tasks: Vec<Task>, process: Process) -> Result<Self> {
        if tasks.is_empty() {
            bail!("A crew needs at least one task");
        }
        for (i, task) in tasks.iter().enumerate() {
            if task.agent >= agents.len() {
                bail!(
                    "Task {} is assigned to agent {} but the crew has {} agents",
                    i,
                    task.agent,
                    agents.len()
                );
            }
        }

        Ok(Self {
            agents,
            tasks,
            process,
        })
    }

    pub async fn kickoff(&self, inputs: &HashMap<String, String>) -> Result<CrewOutput> {
        let agents = self
            .agents
            .iter()
            .map(|a| a.interpolated(inputs))
            .collect::<Result<Vec<_>>>()?;
        let tasks = self
            .tasks
            .iter()
            .map(|t| t.interpolated(inputs))
            .collect::<Result<Vec<_>>>()?;

        match self.process {
            Process::Sequential => Self::run_sequential(&agents, &tasks).await,
        }
    }

    async fn run_sequential(agents: &[Agent], tasks: &[Task]) -> Result<CrewOutput> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(tasks.len());

        for (i, task) in tasks.iter().enumerate() {
            let agent = &agents[task.agent];
            info!("Starting task {} of {} with agent '{}'", i + 1, tasks.len(), agent.role);

            let raw = agent
                .execute(task.prompt(&outputs))
                .await
                .with_context(|| format!("Task {} failed", i + 1))?;

            outputs.push(TaskOutput {
                agent: agent.role.clone(),
                raw,
            });
        }

        let raw = outputs
            .last()
            .map(|o| o.raw.clone())
            .ok_or_else(|| anyhow!("Crew produced no output"))?;

        Ok(CrewOutput {
            raw,
            tasks_output: outputs,
        })
    }
}

/// Replaces `{name}` placeholders with values from `inputs`.
///
/// Braces that do not wrap a plain identifier (JSON snippets, empty braces)
/// are copied through untouched. A placeholder with no matching input is an error.
pub fn interpolate(template: &str, inputs: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find('}') {
            Some(end) if is_placeholder(&after[..end]) => {
                let name = &after[..end];
                let value = inputs
                    .get(name)
                    .ok_or_else(|| anyhow!("Missing required template variable '{}'", name))?;
                out.push_str(value);
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn is_placeholder(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
