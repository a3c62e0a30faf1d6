// The fixed agent and task the /analyze endpoint runs.

use std::sync::Arc;

use super::llm::LlmClient;
use super::{Agent, Task};
use crate::tools::Tool;

pub fn financial_analyst(
    llm: Arc<dyn LlmClient>,
    read_data_tool: Arc<dyn Tool>,
    max_iterations: usize,
) -> Agent {
    Agent::new(
        "Senior Financial Analyst",
        "Provide an accurate, evidence-based answer to the user's request: {query}",
        "You have spent two decades reading annual reports, earnings releases and \
         investor presentations. You rely only on figures you have actually read in \
         the document, quote them precisely, and flag anything the document does not \
         support instead of guessing.",
        llm,
    )
    .with_tool(read_data_tool)
    .with_max_iterations(max_iterations)
}

/// Single task assigned to the analyst at index 0 of the crew.
pub fn analyze_task() -> Task {
    Task::new(
        "Answer the user's request: {query}\n\
         The financial document is a local PDF located at: {file_path}\n\
         Use the read_data_tool with exactly that path to read the document before \
         answering. Base every figure and conclusion on the document's content.",
        "A concise financial analysis that addresses the request, covering the key \
         metrics found in the document, notable risks, and investment insights.",
        0,
    )
}
