//! Chat-completion wire protocol: one ordered list of role-tagged messages,
//! system message first. Assistant messages coalesce an entire canonical
//! message into a single wire item; user messages are emitted per-block.

use regex::Regex;
use serde_json::{json, Value};

use super::base::Usage;
use super::utils::{image_data_uri, sanitize_function_name, user_action_text};
use crate::models::content::{Content, ImageContent};
use crate::models::message::{Message, MessageContent, ToolResultContent};
use crate::models::role::Role;
use crate::models::tool::Tool;

/// Build the full request body for a chat-completion call.
pub fn build_request(
    model: &str,
    system: &str,
    messages: &[Message],
    tools: &[Tool],
    tools_enabled: bool,
) -> Value {
    let mut payload = json!({
        "model": model,
        "messages": messages_to_chat_spec(system, messages),
        "max_tokens": 8192,
    });

    if tools_enabled && !tools.is_empty() {
        payload["tools"] = json!(tools_to_chat_spec(tools));
    }
    // o1/o3 models served over the chat protocol accept a reasoning knob
    if is_reasoning_model(model) {
        payload["reasoning_effort"] = json!("high");
    }

    payload
}

fn is_reasoning_model(model: &str) -> bool {
    Regex::new(r"(?i)\bo1\b|\bo3\b").unwrap().is_match(model)
}

/// Convert internal Tool format to the chat-completion tool specification
pub fn tools_to_chat_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}

/// Convert internal Message history to the chat-completion message list,
/// system message first.
pub fn messages_to_chat_spec(system: &str, messages: &[Message]) -> Vec<Value> {
    let mut spec = vec![json!({
        "role": "system",
        "content": system,
    })];

    for message in messages {
        if message.is_user_action_only() {
            unwrap_user_actions(message, &mut spec);
            continue;
        }

        match message.role {
            Role::Assistant => push_assistant_message(message, &mut spec),
            Role::User => push_user_blocks(message, &mut spec),
        }
    }

    spec
}

/// Messages recording human-performed actions bypass role grouping: each
/// inner block becomes its own user wire message.
fn unwrap_user_actions(message: &Message, spec: &mut Vec<Value>) {
    for block in message.user_action_blocks() {
        match block {
            MessageContent::ToolUse(tool_use) => {
                spec.push(json!({
                    "role": "user",
                    "content": user_action_text(&tool_use.name, &tool_use.input),
                }));
            }
            MessageContent::Text(text) => {
                spec.push(json!({
                    "role": "user",
                    "content": text.text,
                }));
            }
            MessageContent::Image(image) => {
                spec.push(json!({
                    "role": "user",
                    "content": [image_part(image)],
                }));
            }
            // Results, reasoning, and nested wrappers are not recordable as
            // human actions
            MessageContent::ToolResult(_)
            | MessageContent::Thinking(_)
            | MessageContent::UserAction(_) => {}
        }
    }
}

/// Coalesce an entire assistant message into exactly one wire item: text
/// blocks newline-joined into `content`, tool uses collected in order into
/// `tool_calls`, and a thinking block attached as `reasoning_content`.
fn push_assistant_message(message: &Message, spec: &mut Vec<Value>) {
    let mut text_parts: Vec<&str> = Vec::new();
    let mut tool_calls: Vec<Value> = Vec::new();
    let mut reasoning_content: Option<&str> = None;

    for block in &message.content {
        match block {
            MessageContent::Text(text) => text_parts.push(&text.text),
            MessageContent::ToolUse(tool_use) => {
                tool_calls.push(json!({
                    "id": tool_use.id,
                    "type": "function",
                    "function": {
                        "name": sanitize_function_name(&tool_use.name),
                        "arguments": tool_use.input.to_string(),
                    }
                }));
            }
            MessageContent::Thinking(thinking) => {
                reasoning_content = Some(&thinking.thinking);
            }
            // Images, results, and user-action wrappers do not occur in
            // assistant messages
            MessageContent::Image(_)
            | MessageContent::ToolResult(_)
            | MessageContent::UserAction(_) => {}
        }
    }

    let content = if !text_parts.is_empty() {
        json!(text_parts.join("\n"))
    } else if !tool_calls.is_empty() {
        Value::Null
    } else {
        json!("")
    };

    let mut wire = json!({
        "role": "assistant",
        "content": content,
    });
    if !tool_calls.is_empty() {
        wire["tool_calls"] = json!(tool_calls);
    }
    if let Some(reasoning) = reasoning_content {
        wire["reasoning_content"] = json!(reasoning);
    }
    spec.push(wire);
}

/// User messages are emitted per-block, with tool results fanned out into
/// tool-response items plus a trailing image message when needed.
fn push_user_blocks(message: &Message, spec: &mut Vec<Value>) {
    for block in &message.content {
        match block {
            MessageContent::Text(text) => {
                spec.push(json!({
                    "role": "user",
                    "content": text.text,
                }));
            }
            MessageContent::Image(image) => {
                spec.push(json!({
                    "role": "user",
                    "content": [image_part(image)],
                }));
            }
            MessageContent::ToolResult(tool_result) => {
                push_tool_result(tool_result, spec);
            }
            // Tool uses and reasoning belong to the assistant; wrappers are
            // only unwrapped when the whole message is wrapped
            MessageContent::ToolUse(_)
            | MessageContent::Thinking(_)
            | MessageContent::UserAction(_) => {}
        }
    }
}

/// Every tool use must get exactly one tool-response correlation item, and
/// this protocol does not allow images inside one. Text content becomes
/// tool-response items; an image-only result gets a placeholder item, and
/// the images trail in a separate user message.
fn push_tool_result(tool_result: &ToolResultContent, spec: &mut Vec<Value>) {
    let mut responded = false;
    let mut pending_images: Vec<&ImageContent> = Vec::new();

    for content in &tool_result.content {
        match content {
            Content::Text(text) => {
                spec.push(json!({
                    "role": "tool",
                    "tool_call_id": tool_result.tool_use_id,
                    "content": text.text,
                }));
                responded = true;
            }
            Content::Image(image) => {
                if !responded {
                    spec.push(json!({
                        "role": "tool",
                        "tool_call_id": tool_result.tool_use_id,
                        "content": "screenshot",
                    }));
                    responded = true;
                }
                pending_images.push(image);
            }
        }
    }

    if !pending_images.is_empty() {
        let mut parts = vec![json!({"type": "text", "text": "Screenshot"})];
        parts.extend(pending_images.into_iter().map(image_part));
        spec.push(json!({
            "role": "user",
            "content": parts,
        }));
    }
}

fn image_part(image: &ImageContent) -> Value {
    json!({
        "type": "image_url",
        "image_url": {
            "url": image_data_uri(image),
            "detail": "high",
        }
    })
}

/// Convert a chat-completion response into canonical content blocks plus
/// token usage. Total: malformed tool arguments and refusals degrade to
/// diagnostic text blocks rather than failing the parse.
pub fn response_to_content(response: &Value) -> (Vec<MessageContent>, Usage) {
    let message = &response["choices"][0]["message"];
    let mut blocks = Vec::new();

    if let Some(text) = message.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            blocks.push(MessageContent::text(text));
        }
    }

    // Reasoning arrives as a bare string field on this protocol; map it to
    // the same Thinking shape the structured protocol produces. There is no
    // separate item identifier, so the payload doubles as the signature.
    if let Some(reasoning) = message.get("reasoning_content").and_then(|v| v.as_str()) {
        if !reasoning.is_empty() {
            blocks.push(MessageContent::thinking(reasoning, reasoning));
        }
    }

    if let Some(tool_calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call in tool_calls {
            let kind = tool_call
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("function");
            if kind != "function" {
                continue;
            }
            let id = tool_call["id"].as_str().unwrap_or_default();
            let name = tool_call["function"]["name"].as_str().unwrap_or_default();
            let raw_arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();
            let arguments = if raw_arguments.is_empty() {
                "{}"
            } else {
                raw_arguments
            };

            match serde_json::from_str::<Value>(arguments) {
                Ok(input) => blocks.push(MessageContent::tool_use(id, name, input)),
                Err(e) => {
                    tracing::error!(
                        tool = name,
                        raw = raw_arguments,
                        "Failed to parse tool arguments: {}",
                        e
                    );
                    blocks.push(MessageContent::text(format!(
                        "[ERROR] Failed to parse arguments for {}: {}",
                        name, raw_arguments
                    )));
                }
            }
        }
    }

    if let Some(refusal) = message.get("refusal").and_then(|v| v.as_str()) {
        blocks.push(MessageContent::text(format!("Refusal: {}", refusal)));
    }

    (blocks, get_usage(response))
}

fn get_usage(response: &Value) -> Usage {
    let usage = &response["usage"];
    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);
    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);
    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });
    Usage::new(input_tokens, output_tokens, total_tokens)
}
