//! Structured-response wire protocol: a flat ordered list of typed items,
//! one concept per item. Nothing is coalesced; assistant text, tool calls,
//! and reasoning each become their own item, and tool output correlates by
//! explicit function-call / function-call-output item types.

use serde_json::{json, Value};

use super::base::Usage;
use super::utils::{image_data_uri, user_action_text};
use crate::models::content::{Content, ImageContent};
use crate::models::message::{Message, MessageContent, ToolResultContent};
use crate::models::role::Role;
use crate::models::tool::Tool;

/// Build the full request body for a structured-response call.
pub fn build_request(
    model: &str,
    system: &str,
    messages: &[Message],
    tools: &[Tool],
    tools_enabled: bool,
) -> Value {
    let is_reasoning = model.starts_with('o');

    let mut payload = json!({
        "model": model,
        "max_output_tokens": 8192,
        "input": messages_to_response_items(messages),
        "instructions": system,
        "tools": if tools_enabled { json!(tools_to_responses_spec(tools)) } else { json!([]) },
        "store": false,
    });

    if is_reasoning {
        payload["reasoning"] = json!({"effort": "medium"});
        // Without this the backend omits the encrypted reasoning payload we
        // need to round-trip on the next turn
        payload["include"] = json!(["reasoning.encrypted_content"]);
    } else {
        payload["reasoning"] = Value::Null;
        payload["include"] = json!([]);
    }

    payload
}

/// Convert internal Tool format to the structured-response tool
/// specification (flat fields, no nested `function` object).
pub fn tools_to_responses_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            })
        })
        .collect()
}

/// Convert internal Message history to the flat item list.
pub fn messages_to_response_items(messages: &[Message]) -> Vec<Value> {
    let mut items = Vec::new();

    for message in messages {
        if message.is_user_action_only() {
            for block in message.user_action_blocks() {
                match block {
                    MessageContent::ToolUse(tool_use) => {
                        items.push(input_text_item(&user_action_text(
                            &tool_use.name,
                            &tool_use.input,
                        )));
                    }
                    MessageContent::Text(text) => items.push(input_text_item(&text.text)),
                    MessageContent::Image(image) => items.push(input_image_item(image)),
                    MessageContent::ToolResult(_)
                    | MessageContent::Thinking(_)
                    | MessageContent::UserAction(_) => {}
                }
            }
            continue;
        }

        for block in &message.content {
            match block {
                MessageContent::Text(text) => {
                    if message.role == Role::User {
                        items.push(input_text_item(&text.text));
                    } else {
                        items.push(json!({
                            "type": "message",
                            "role": "assistant",
                            "content": [{
                                "type": "output_text",
                                "text": text.text,
                            }],
                        }));
                    }
                }
                MessageContent::Image(image) => items.push(input_image_item(image)),
                MessageContent::ToolUse(tool_use) => {
                    if message.role == Role::Assistant {
                        items.push(json!({
                            "type": "function_call",
                            "call_id": tool_use.id,
                            "name": tool_use.name,
                            "arguments": tool_use.input.to_string(),
                        }));
                    }
                }
                MessageContent::Thinking(thinking) => {
                    // Replayed verbatim under the backend's own item id so it
                    // accepts the encrypted payload back
                    items.push(json!({
                        "type": "reasoning",
                        "id": thinking.signature,
                        "encrypted_content": thinking.thinking,
                        "summary": [],
                    }));
                }
                MessageContent::ToolResult(tool_result) => {
                    push_tool_result(tool_result, &mut items);
                }
                MessageContent::UserAction(_) => {}
            }
        }
    }

    items
}

/// Text content becomes function-call-output items; this protocol tolerates
/// an empty output, so an image-only result gets one empty output item for
/// correlation and the images follow as separate image items.
fn push_tool_result(tool_result: &ToolResultContent, items: &mut Vec<Value>) {
    let mut responded = false;
    let mut pending_images: Vec<&ImageContent> = Vec::new();

    for content in &tool_result.content {
        match content {
            Content::Text(text) => {
                items.push(json!({
                    "type": "function_call_output",
                    "call_id": tool_result.tool_use_id,
                    "output": text.text,
                }));
                responded = true;
            }
            Content::Image(image) => pending_images.push(image),
        }
    }

    if !responded {
        items.push(json!({
            "type": "function_call_output",
            "call_id": tool_result.tool_use_id,
            "output": "",
        }));
    }
    for image in pending_images {
        items.push(input_image_item(image));
    }
}

fn input_text_item(text: &str) -> Value {
    json!({
        "type": "message",
        "role": "user",
        "content": [{
            "type": "input_text",
            "text": text,
        }],
    })
}

fn input_image_item(image: &ImageContent) -> Value {
    json!({
        "type": "message",
        "role": "user",
        "content": [{
            "type": "input_image",
            "detail": "high",
            "image_url": image_data_uri(image),
        }],
    })
}

/// Convert a structured response into canonical content blocks plus token
/// usage. Total: malformed tool arguments, refusals, and unknown item kinds
/// all degrade to diagnostic text blocks rather than failing the parse.
pub fn response_to_content(response: &Value) -> (Vec<MessageContent>, Usage) {
    let mut blocks = Vec::new();

    let output = response
        .get("output")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    for item in &output {
        match item.get("type").and_then(|v| v.as_str()).unwrap_or_default() {
            "message" => {
                let content = item
                    .get("content")
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default();
                for part in &content {
                    if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                        blocks.push(MessageContent::text(text));
                    } else if let Some(refusal) = part.get("refusal").and_then(|v| v.as_str()) {
                        blocks.push(MessageContent::text(format!("Refusal: {}", refusal)));
                    }
                }
            }
            "function_call" => {
                let id = item["call_id"].as_str().unwrap_or_default();
                let name = item["name"].as_str().unwrap_or_default();
                let raw_arguments = item["arguments"].as_str().unwrap_or_default();
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
            "reasoning" => {
                // Only keep reasoning items that carry an encrypted payload;
                // the backend's item id becomes the signature we replay
                let encrypted = item
                    .get("encrypted_content")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                if !encrypted.is_empty() {
                    let signature = item["id"].as_str().unwrap_or_default();
                    blocks.push(MessageContent::thinking(encrypted, signature));
                }
            }
            // file_search_call, code_interpreter_call, mcp_call, and anything
            // this adapter has no canonical representation for: keep the turn
            // alive by degrading to the serialized item
            other => {
                tracing::warn!(kind = other, "Unsupported response output item type");
                blocks.push(MessageContent::text(item.to_string()));
            }
        }
    }

    (blocks, get_usage(response))
}

fn get_usage(response: &Value) -> Usage {
    let usage = &response["usage"];
    let input_tokens = usage
        .get("input_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);
    let output_tokens = usage
        .get("output_tokens")
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_blocks_not_coalesced() {
        let messages = vec![Message::assistant()
            .with_text("first")
            .with_text("second")
            .with_tool_use("call_1", "screenshot", json!({}))];
        let items = messages_to_response_items(&messages);

        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["type"], "message");
        assert_eq!(items[0]["content"][0]["type"], "output_text");
        assert_eq!(items[0]["content"][0]["text"], "first");
        assert_eq!(items[1]["content"][0]["text"], "second");
        assert_eq!(items[2]["type"], "function_call");
        assert_eq!(items[2]["call_id"], "call_1");
        assert_eq!(items[2]["arguments"], "{}");
    }

    #[test]
    fn test_thinking_item_shape() {
        let messages = vec![Message::assistant().with_thinking("payload", "rs_1")];
        let items = messages_to_response_items(&messages);

        assert_eq!(
            items[0],
            json!({
                "type": "reasoning",
                "id": "rs_1",
                "encrypted_content": "payload",
                "summary": [],
            })
        );
    }

    #[test]
    fn test_tool_result_text_and_images() {
        let messages = vec![Message::user().with_tool_result(
            "call_3",
            vec![
                Content::text("ok"),
                Content::image("aW1n", "image/png"),
            ],
        )];
        let items = messages_to_response_items(&messages);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "function_call_output");
        assert_eq!(items[0]["call_id"], "call_3");
        assert_eq!(items[0]["output"], "ok");
        assert_eq!(items[1]["content"][0]["type"], "input_image");
        assert_eq!(
            items[1]["content"][0]["image_url"],
            "data:image/png;base64,aW1n"
        );
    }

    #[test]
    fn test_image_only_tool_result_keeps_correlation() {
        let messages = vec![Message::user().with_tool_result(
            "call_3",
            vec![Content::image("aW1n", "image/png")],
        )];
        let items = messages_to_response_items(&messages);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "function_call_output");
        assert_eq!(items[0]["output"], "");
        assert_eq!(items[1]["content"][0]["type"], "input_image");
    }

    #[test]
    fn test_user_action_unwrap_per_block() {
        let messages = vec![Message::user().with_user_action(vec![
            MessageContent::tool_use("call_1", "press_keys", json!({"keys": ["ctrl", "c"]})),
            MessageContent::image("aW1n", "image/png"),
        ])];
        let items = messages_to_response_items(&messages);

        assert_eq!(items.len(), 2);
        let text = items[0]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("User performed action: press_keys"));
        assert_eq!(items[1]["content"][0]["type"], "input_image");
    }

    #[test]
    fn test_build_request_reasoning_model() {
        let payload = build_request("o3-2025-04-16", "sys", &[], &[], true);
        assert_eq!(payload["reasoning"]["effort"], "medium");
        assert_eq!(payload["include"][0], "reasoning.encrypted_content");
        assert_eq!(payload["store"], false);
        assert_eq!(payload["instructions"], "sys");
        assert_eq!(payload["max_output_tokens"], 8192);

        let plain = build_request("gpt-4.1-2025-04-14", "sys", &[], &[], true);
        assert!(plain["reasoning"].is_null());
        assert_eq!(plain["include"], json!([]));
    }

    #[test]
    fn test_build_request_tools_disabled() {
        let tool = Tool::new("screenshot", "Take a screenshot", json!({"type": "object"}));
        let payload = build_request("gpt-5", "sys", &[], &[tool], false);
        assert_eq!(payload["tools"], json!([]));
    }

    #[test]
    fn test_parse_message_and_refusal() {
        let response = json!({
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [
                    { "type": "output_text", "text": "All done" },
                    { "type": "refusal", "refusal": "not that" }
                ]
            }],
            "usage": { "input_tokens": 7, "output_tokens": 2, "total_tokens": 9 }
        });

        let (blocks, usage) = response_to_content(&response);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].as_text(), Some("All done"));
        assert_eq!(blocks[1].as_text(), Some("Refusal: not that"));
        assert_eq!(usage.total_tokens, Some(9));
    }

    #[test]
    fn test_parse_function_call() {
        let response = json!({
            "output": [{
                "type": "function_call",
                "call_id": "call_2",
                "name": "click_mouse",
                "arguments": "{\"button\":\"left\"}"
            }]
        });

        let (blocks, _) = response_to_content(&response);
        let tool_use = blocks[0].as_tool_use().unwrap();
        assert_eq!(tool_use.id, "call_2");
        assert_eq!(tool_use.input, json!({"button": "left"}));
    }

    #[test]
    fn test_parse_malformed_arguments_degrades() {
        let response = json!({
            "output": [{
                "type": "function_call",
                "call_id": "call_2",
                "name": "click_mouse",
                "arguments": "{"
            }]
        });

        let (blocks, _) = response_to_content(&response);
        assert_eq!(blocks.len(), 1);
        let text = blocks[0].as_text().unwrap();
        assert!(text.starts_with("[ERROR] Failed to parse arguments for click_mouse"));
        assert!(blocks.iter().all(|b| !b.is_tool_use()));
    }

    #[test]
    fn test_parse_reasoning_requires_payload() {
        let response = json!({
            "output": [
                { "type": "reasoning", "id": "rs_9", "encrypted_content": "secret" },
                { "type": "reasoning", "id": "rs_10" }
            ]
        });

        let (blocks, _) = response_to_content(&response);
        assert_eq!(blocks.len(), 1);
        let thinking = blocks[0].as_thinking().unwrap();
        assert_eq!(thinking.signature, "rs_9");
        assert_eq!(thinking.thinking, "secret");
    }

    #[test]
    fn test_parse_unsupported_item_degrades_to_text() {
        let response = json!({
            "output": [{
                "type": "file_search_call",
                "id": "fs_1",
                "queries": ["report.pdf"]
            }]
        });

        let (blocks, _) = response_to_content(&response);
        assert_eq!(blocks.len(), 1);
        let text = blocks[0].as_text().unwrap();
        assert!(text.contains("file_search_call"));
        assert!(text.contains("report.pdf"));
    }
}
