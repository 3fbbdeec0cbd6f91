//! Completion client backed by an OpenAI-compatible endpoint.

use super::{collect_stream, ChunkHandler, Completion, CompletionClient, StreamInterrupted};
use crate::agent::{AgentConfig, ExtractionSchema, ResponseFormat};
use crate::cancel::cancellable;
use crate::config::EndpointSettings;
use crate::conversation::{Conversation, Message, Role};
use crate::error::{Result, ScoutError};
use crate::openai::create_client;
use crate::tools::{ToolCallRequest, ToolDefinition};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
    ResponseFormat as ApiResponseFormat, ResponseFormatJsonSchema,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Completion client for OpenAI-compatible chat completion APIs.
pub struct OpenAICompletionClient {
    client: Client<OpenAIConfig>,
}

impl OpenAICompletionClient {
    /// Create a client for the configured endpoint.
    pub fn new(endpoint: &EndpointSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(endpoint)?,
        })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompletionClient {
    #[instrument(skip_all, fields(model = %config.model, tools = tools.len()))]
    async fn complete(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let request = build_request(conversation, config, tools, None)?;

        let response = cancellable(cancel, async {
            self.client.chat().create(request).await.map_err(ScoutError::from)
        })
        .await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::MalformedResponse("No choices in response".to_string()))?
            .message;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, call)| tool_call_from_api(idx, call))
            .collect::<Result<Vec<_>>>()?;

        let completion = Completion::from_parts(message.content, tool_calls)?;
        match &completion {
            Completion::Text(text) => debug!("Model answered with {} chars", text.len()),
            Completion::ToolCalls(calls) => info!("Model requested {} tool call(s)", calls.len()),
        }
        Ok(completion)
    }

    #[instrument(skip_all, fields(model = %config.model, schema = %schema.name))]
    async fn complete_structured(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        schema: &ExtractionSchema,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let request = build_request(conversation, config, &[], Some(schema))?;

        let response = cancellable(cancel, async {
            self.client.chat().create(request).await.map_err(ScoutError::from)
        })
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ScoutError::MalformedResponse("Structured response has no content".to_string())
            })
    }

    #[instrument(skip_all, fields(model = %config.model))]
    async fn complete_stream(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        on_chunk: &mut ChunkHandler<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, StreamInterrupted> {
        let request = build_request(conversation, config, &[], None)
            .map_err(|e| StreamInterrupted::new(String::new(), e))?;

        let stream = cancellable(cancel, async {
            self.client.chat().create_stream(request).await.map_err(ScoutError::from)
        })
        .await
        .map_err(|e| StreamInterrupted::new(String::new(), e))?;

        let fragments = stream.map(|event| {
            event.map_err(ScoutError::from).map(|response| {
                response
                    .choices
                    .into_iter()
                    .filter_map(|choice| choice.delta.content)
                    .collect::<String>()
            })
        });

        collect_stream(fragments, on_chunk, cancel).await
    }
}

/// Build a chat completion request for a conversation.
///
/// `schema` overrides the response format configured on the agent.
pub(crate) fn build_request(
    conversation: &Conversation,
    config: &AgentConfig,
    tools: &[ToolDefinition],
    schema: Option<&ExtractionSchema>,
) -> Result<CreateChatCompletionRequest> {
    let messages = conversation
        .messages()
        .iter()
        .map(to_api_message)
        .collect::<Result<Vec<_>>>()?;

    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(&config.model)
        .messages(messages)
        .temperature(config.temperature);

    if let Some(top_p) = config.top_p {
        args.top_p(top_p);
    }

    if !tools.is_empty() {
        args.tools(tools.iter().map(to_api_tool).collect::<Vec<_>>())
            .parallel_tool_calls(config.parallel_tool_calls);
    }

    let schema = schema.or(match &config.response_format {
        ResponseFormat::Schema(schema) => Some(schema),
        ResponseFormat::None => None,
    });
    if let Some(schema) = schema {
        args.response_format(ApiResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: schema.description.clone(),
                name: schema.name.clone(),
                schema: Some(schema.schema.clone()),
                strict: Some(schema.strict),
            },
        });
    }

    Ok(args.build()?)
}

fn to_api_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let converted: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() {
                args.content(message.content.clone());
            }
            if !message.tool_calls.is_empty() {
                args.tool_calls(
                    message
                        .tool_calls
                        .iter()
                        .map(tool_call_to_api)
                        .collect::<Vec<_>>(),
                );
            }
            args.build()?.into()
        }
        Role::Tool => {
            let tool_call_id = message.tool_call_id.clone().ok_or_else(|| {
                ScoutError::InvalidInput("Tool message without a tool_call_id".to_string())
            })?;
            ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(tool_call_id)
                .content(message.content.clone())
                .build()?
                .into()
        }
    };
    Ok(converted)
}

fn to_api_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.clone(),
            description: Some(definition.description.clone()),
            parameters: Some(definition.parameters.clone()),
            strict: None,
        },
    }
}

fn tool_call_to_api(request: &ToolCallRequest) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: request.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: request.tool_name.clone(),
            arguments: Value::Object(request.arguments.clone()).to_string(),
        },
    }
}

fn tool_call_from_api(idx: usize, call: ChatCompletionMessageToolCall) -> Result<ToolCallRequest> {
    let arguments = parse_arguments(&call.function.arguments)?;
    // Some local runners leave the id empty
    let id = if call.id.is_empty() {
        format!("call_{}", idx)
    } else {
        call.id
    };
    Ok(ToolCallRequest::new(id, call.function.name, arguments))
}

/// Parse the JSON-encoded arguments of a tool call.
fn parse_arguments(raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ScoutError::MalformedResponse(format!(
            "Tool arguments must be a JSON object, got: {}",
            other
        ))),
        Err(e) => Err(ScoutError::MalformedResponse(format!(
            "Invalid tool arguments: {}",
            e
        ))),
    }
}
