//! Schema-typed function-calling protocol (Google GenAI wire shape): typed
//! function declarations, role-tagged contents built from typed parts, and
//! name-correlated function responses.
//!
//! Grouping follows the chat-completion policy: one wire content per
//! canonical message, with blocks becoming parts inside it. This backend
//! correlates tool output by function *name* rather than call id, so the
//! compiler pre-scans the history for the id-to-name mapping. Thinking
//! blocks have no equivalent item and are dropped on compile.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};
use uuid::Uuid;

use super::base::{Provider, Usage};
use super::client::CredentialedClient;
use super::configs::GoogleProviderConfig;
use super::utils::user_action_text;
use crate::errors::{ProviderError, ProviderResult};
use crate::interrupt::InterruptSignal;
use crate::models::content::{Content, ImageContent};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::Tool;
use async_trait::async_trait;

/// Map a restricted JSON-Schema type to the backend's type tag. Unknown
/// types fall back to STRING rather than failing; the backend rejects
/// unconstrained values anyway and the permissive mapping keeps otherwise
/// valid declarations usable.
fn google_type(schema_type: &str) -> &'static str {
    match schema_type {
        "string" => "STRING",
        "number" => "NUMBER",
        "integer" => "INTEGER",
        "boolean" => "BOOLEAN",
        "array" => "ARRAY",
        "object" => "OBJECT",
        _ => "STRING",
    }
}

/// Translate a restricted JSON Schema into the backend's parameter schema,
/// recursing through array items and object properties.
///
/// Numeric enums are coerced: this backend only supports string-typed
/// enumerations, so `{type:"integer", enum:[1,2,3]}` becomes
/// `{type:"STRING", enum:["1","2","3"]}`. The constraint survives, but the
/// tool executor must re-parse these argument values back to numbers; see
/// the note on `GoogleProvider::complete`.
pub fn schema_to_google(schema: &Value) -> Value {
    let schema_type = schema
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let mut result = json!({
        "type": google_type(schema_type),
    });

    if let Some(description) = schema.get("description") {
        result["description"] = description.clone();
    }

    if let Some(enum_values) = schema.get("enum").and_then(|v| v.as_array()) {
        match schema_type {
            "string" => result["enum"] = json!(enum_values),
            "integer" | "number" => {
                let coerced: Vec<String> = enum_values.iter().map(enum_value_string).collect();
                tracing::debug!(
                    from = %schema["enum"],
                    to = ?coerced,
                    "Coerced numeric enum to string enum for function-calling backend"
                );
                result["enum"] = json!(coerced);
                result["type"] = json!("STRING");
            }
            _ => {}
        }
    }

    if schema.get("nullable").and_then(|v| v.as_bool()) == Some(true) {
        result["nullable"] = json!(true);
    }

    if schema_type == "array" {
        if let Some(items) = schema.get("items") {
            result["items"] = schema_to_google(items);
        }
    }

    if schema_type == "object" {
        if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
            let mut converted = serde_json::Map::new();
            for (key, value) in properties {
                converted.insert(key.clone(), schema_to_google(value));
            }
            result["properties"] = Value::Object(converted);
            if let Some(required) = schema.get("required") {
                result["required"] = required.clone();
            }
        }
    }

    result
}

fn enum_value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Translate a canonical tool definition into a function declaration.
pub fn tool_to_function_declaration(tool: &Tool) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": schema_to_google(&tool.input_schema),
    })
}

/// Convert internal Tool format to the backend's tools specification.
pub fn tools_to_google_spec(tools: &[Tool]) -> Vec<Value> {
    vec![json!({
        "functionDeclarations": tools
            .iter()
            .map(tool_to_function_declaration)
            .collect::<Vec<_>>(),
    })]
}

/// Local binding name for a snake_case tool name: the conventional
/// "computer" domain segments are dropped and the remaining segments
/// camel-cased, e.g. `computer_move_mouse` -> `moveMouse`. Only used to key
/// `declaration_bindings`; the wire `name` field is always the canonical
/// tool name.
pub fn binding_name(tool_name: &str) -> String {
    let mut binding = String::new();
    for segment in tool_name
        .split('_')
        .filter(|segment| !segment.is_empty() && *segment != "computer")
    {
        if binding.is_empty() {
            binding.push_str(segment);
        } else {
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                binding.extend(first.to_uppercase());
                binding.push_str(chars.as_str());
            }
        }
    }
    binding
}

/// Translated declarations keyed by their local binding name.
pub fn declaration_bindings(tools: &[Tool]) -> BTreeMap<String, Value> {
    tools
        .iter()
        .map(|tool| (binding_name(&tool.name), tool_to_function_declaration(tool)))
        .collect()
}

/// Build the full request body for a function-calling generate call.
pub fn build_request(
    system: &str,
    messages: &[Message],
    tools: &[Tool],
    tools_enabled: bool,
) -> Value {
    let mut payload = json!({
        "systemInstruction": {
            "parts": [{ "text": system }],
        },
        "contents": messages_to_google_spec(messages),
        "generationConfig": {
            "maxOutputTokens": 8192,
        },
    });

    if tools_enabled && !tools.is_empty() {
        payload["tools"] = json!(tools_to_google_spec(tools));
    }

    payload
}

/// Convert internal Message history to the backend's contents list. One
/// content per canonical message (chat-style grouping); user-action-only
/// messages unwrap into a single user content of action parts.
pub fn messages_to_google_spec(messages: &[Message]) -> Vec<Value> {
    // function responses correlate by name on this backend
    let mut tool_names: HashMap<&str, &str> = HashMap::new();
    for message in messages {
        for block in &message.content {
            if let MessageContent::ToolUse(tool_use) = block {
                tool_names.insert(&tool_use.id, &tool_use.name);
            }
        }
    }

    let mut contents = Vec::new();

    for message in messages {
        if message.is_user_action_only() {
            let mut parts = Vec::new();
            for block in message.user_action_blocks() {
                match block {
                    MessageContent::ToolUse(tool_use) => {
                        parts.push(json!({
                            "text": user_action_text(&tool_use.name, &tool_use.input),
                        }));
                    }
                    MessageContent::Text(text) => parts.push(json!({"text": text.text})),
                    MessageContent::Image(image) => parts.push(inline_data_part(image)),
                    MessageContent::ToolResult(_)
                    | MessageContent::Thinking(_)
                    | MessageContent::UserAction(_) => {}
                }
            }
            if !parts.is_empty() {
                contents.push(json!({"role": "user", "parts": parts}));
            }
            continue;
        }

        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        let mut parts = Vec::new();

        for block in &message.content {
            match block {
                MessageContent::Text(text) => parts.push(json!({"text": text.text})),
                MessageContent::Image(image) => parts.push(inline_data_part(image)),
                MessageContent::ToolUse(tool_use) => {
                    parts.push(json!({
                        "functionCall": {
                            "name": tool_use.name,
                            "args": tool_use.input,
                        }
                    }));
                }
                MessageContent::ToolResult(tool_result) => {
                    let name = tool_names
                        .get(tool_result.tool_use_id.as_str())
                        .copied()
                        .unwrap_or(tool_result.tool_use_id.as_str());
                    let mut responded = false;
                    let mut pending_images: Vec<&ImageContent> = Vec::new();

                    for content in &tool_result.content {
                        match content {
                            Content::Text(text) => {
                                parts.push(function_response_part(name, &text.text));
                                responded = true;
                            }
                            Content::Image(image) => pending_images.push(image),
                        }
                    }
                    if !responded {
                        parts.push(function_response_part(name, ""));
                    }
                    for image in pending_images {
                        parts.push(inline_data_part(image));
                    }
                }
                // No reasoning item on this backend; dropped on compile
                MessageContent::Thinking(_) => {}
                MessageContent::UserAction(_) => {}
            }
        }

        if !parts.is_empty() {
            contents.push(json!({"role": role, "parts": parts}));
        }
    }

    contents
}

fn function_response_part(name: &str, output: &str) -> Value {
    json!({
        "functionResponse": {
            "name": name,
            "response": { "output": output },
        }
    })
}

fn inline_data_part(image: &ImageContent) -> Value {
    let clean: String = image
        .data
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    json!({
        "inlineData": {
            "mimeType": if image.mime_type.is_empty() { "image/png" } else { image.mime_type.as_str() },
            "data": clean,
        }
    })
}

/// Convert a generate response into canonical content blocks plus token
/// usage. The backend returns no call ids, so each function call gets a
/// freshly minted one; unknown part kinds degrade to serialized text.
pub fn response_to_content(response: &Value) -> (Vec<MessageContent>, Usage) {
    let mut blocks = Vec::new();

    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    for part in &parts {
        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            blocks.push(MessageContent::text(text));
        } else if let Some(call) = part.get("functionCall") {
            let name = call["name"].as_str().unwrap_or_default();
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
            let id = format!("call_{}", Uuid::new_v4().simple());
            blocks.push(MessageContent::tool_use(id, name, args));
        } else {
            tracing::warn!(part = %part, "Unsupported response part");
            blocks.push(MessageContent::text(part.to_string()));
        }
    }

    (blocks, get_usage(response))
}

fn get_usage(response: &Value) -> Usage {
    let usage = &response["usageMetadata"];
    let input_tokens = usage
        .get("promptTokenCount")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);
    let output_tokens = usage
        .get("candidatesTokenCount")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);
    let total_tokens = usage
        .get("totalTokenCount")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });
    Usage::new(input_tokens, output_tokens, total_tokens)
}

pub struct GoogleProvider {
    client: CredentialedClient,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Self {
        Self {
            client: CredentialedClient::new(),
            config,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(GoogleProviderConfig::from_env()?))
    }

    async fn post(
        &self,
        payload: Value,
        interrupt: Option<&InterruptSignal>,
    ) -> ProviderResult<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.host.trim_end_matches('/'),
            self.config.model,
            self.config.api_key,
        );

        let client = self.client.for_credential(&self.config.api_key)?;
        let request = client.post(&url).json(&payload).send();

        let response = match interrupt {
            Some(signal) => tokio::select! {
                _ = signal.interrupted() => return Err(ProviderError::Interrupted),
                result = request => result?,
            },
            None => request.await?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "Request failed: {} - {}",
                status, body
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    /// Note on numeric tool parameters: the schema translator coerces
    /// numeric enums to string enums, so argument values for those
    /// parameters arrive as strings here and the tool executor re-parses
    /// them.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        interrupt: Option<&InterruptSignal>,
    ) -> ProviderResult<(Message, Usage)> {
        let payload = build_request(system, messages, tools, !tools.is_empty());
        let response = self.post(payload, interrupt).await?;

        let (blocks, usage) = response_to_content(&response);
        let mut message = Message::assistant();
        message.content = blocks;
        Ok((message, usage))
    }
}
