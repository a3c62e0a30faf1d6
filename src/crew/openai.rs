use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, ToolCall};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAiCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: Option<&str>,
        endpoint: Option<&str>,
        model: Option<&str>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        // Local OpenAI-compatible servers usually run without auth.
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", key))
                .context("Invalid API key format")?;
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint
                .filter(|e| !e.is_empty())
                .unwrap_or(DEFAULT_ENDPOINT)
                .to_string(),
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MODEL)
                .to_string(),
            max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, request: CompletionRequest) -> OpenAiCompletionRequest {
        let messages = request.messages.into_iter().map(to_openai_message).collect();

        let tools: Option<Vec<OpenAiTool>> = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .into_iter()
                    .map(|t| OpenAiTool {
                        tool_type: "function".to_string(),
                        function: OpenAiFunction {
                            name: t.name,
                            description: t.description,
                            parameters: t.input_schema,
                        },
                    })
                    .collect(),
            )
        };

        OpenAiCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
        }
    }
}

fn to_openai_message(message: ChatMessage) -> OpenAiMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .into_iter()
                .map(|tc| OpenAiToolCall {
                    id: tc.id,
                    call_type: "function".to_string(),
                    function: OpenAiFunctionCall {
                        name: tc.name,
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    OpenAiMessage {
        role: message.role.as_str().to_string(),
        content: Some(message.content),
        tool_calls,
        tool_call_id: message.tool_call_id,
    }
}

fn parse_response(body: &str) -> Result<CompletionResponse> {
    let response: OpenAiCompletionResponse = serde_json::from_str(body)
        .with_context(|| format!("Failed to parse completion response: {}", body))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Completion API returned no choices"))?;

    debug!(
        "Completion finish_reason: {:?}",
        choice.finish_reason.as_deref()
    );

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            // Models occasionally emit malformed JSON; let the tool report it.
            arguments: serde_json::from_str(&tc.function.arguments)
                .unwrap_or(Value::String(tc.function.arguments)),
        })
        .collect();

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let request = self.build_request(request);

        info!(
            "Sending completion request to {} with model {} and {} tools",
            self.endpoint,
            self.model,
            request.tools.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Completion API request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read completion response")?;

        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(&body) {
                return Err(anyhow!(
                    "Completion API error: {}",
                    error_response.error.message
                ));
            }
            return Err(anyhow!(
                "Completion API returned error status: {}, body: {}",
                status,
                body
            ));
        }

        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::llm::Role;
    use serde_json::json;
    use crate::tools::read_data_tool::READ_DATA_TOOL_DEFINITION;

    fn client() -> OpenAiClient {
        OpenAiClient::new(None, None, None, 4096, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn defaults_apply_to_empty_settings() {
        let client = OpenAiClient::new(Some(""), Some(""), Some(""), 1, Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn request_carries_tools_and_history() {
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system("You are an analyst"),
                ChatMessage::assistant(
                    "",
                    vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "read_data_tool".to_string(),
                        arguments: json!({ "path": "/tmp/a.pdf" }),
                    }],
                ),
                ChatMessage::tool_result("call_1", "Revenue: 10M"),
            ],
            tools: vec![READ_DATA_TOOL_DEFINITION.clone()],
        };

        let body = serde_json::to_value(client().build_request(request)).unwrap();

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "read_data_tool");
        assert_eq!(
            body["tools"][0]["function"].as_object().unwrap().len(),
            3,
            "function carries only name, description and parameters"
        );
        assert_eq!(
            body["tools"][0]["function"]["parameters"]["required"][0],
            "path"
        );
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(
            body["messages"][1]["tool_calls"][0]["function"]["arguments"],
            r#"{"path":"/tmp/a.pdf"}"#
        );
        assert_eq!(body["messages"][2]["role"], "tool");
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
    }

    #[test]
    fn request_without_tools_omits_tool_choice() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
        };
        let body = serde_json::to_value(client().build_request(request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn parses_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "read_data_tool", "arguments": "{\"path\": \"/x.pdf\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        let response = parse_response(body).unwrap();
        assert_eq!(response.content, "");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments["path"], "/x.pdf");
    }

    #[test]
    fn parses_text_and_rejects_empty_choices() {
        let body = r#"{"choices":[{"message":{"content":"Buy."},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_response(body).unwrap().content, "Buy.");
        assert!(parse_response(r#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
        assert_eq!(Role::Tool.as_str(), "tool");
    }
}
