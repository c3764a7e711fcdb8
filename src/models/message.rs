use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::{Content, ImageContent, TextContent};
use super::role::Role;

/// An assistant-issued tool invocation. The id is opaque but stable: it is
/// reused verbatim as the correlation key when the result is sent back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseContent {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// The outcome of a prior tool invocation, correlated by `tool_use_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultContent {
    pub tool_use_id: String,
    pub content: Vec<Content>,
}

/// An opaque reasoning artifact. `signature` is the backend's own item
/// identifier and is replayed verbatim if the backend requires it back;
/// neither field is ever interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingContent {
    pub thinking: String,
    pub signature: String,
}

/// Wrapper marking blocks that record a human-performed action rather than
/// an assistant action. When a message consists entirely of these wrappers
/// the compilers unwrap them before applying role-based grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActionContent {
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Content passed inside a message: the full canonical block union.
pub enum MessageContent {
    Text(TextContent),
    Image(ImageContent),
    ToolUse(ToolUseContent),
    ToolResult(ToolResultContent),
    Thinking(ThinkingContent),
    UserAction(UserActionContent),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(TextContent { text: text.into() })
    }

    pub fn image<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        MessageContent::Image(ImageContent {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    pub fn tool_use<I: Into<String>, N: Into<String>>(id: I, name: N, input: Value) -> Self {
        MessageContent::ToolUse(ToolUseContent {
            id: id.into(),
            name: name.into(),
            input,
        })
    }

    pub fn tool_result<S: Into<String>>(tool_use_id: S, content: Vec<Content>) -> Self {
        MessageContent::ToolResult(ToolResultContent {
            tool_use_id: tool_use_id.into(),
            content,
        })
    }

    pub fn thinking<T: Into<String>, S: Into<String>>(thinking: T, signature: S) -> Self {
        MessageContent::Thinking(ThinkingContent {
            thinking: thinking.into(),
            signature: signature.into(),
        })
    }

    pub fn user_action(content: Vec<MessageContent>) -> Self {
        MessageContent::UserAction(UserActionContent { content })
    }

    pub fn is_user_action(&self) -> bool {
        matches!(self, MessageContent::UserAction(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MessageContent::Image(_))
    }

    pub fn is_tool_use(&self) -> bool {
        matches!(self, MessageContent::ToolUse(_))
    }

    /// Get the text content if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<&ToolUseContent> {
        match self {
            MessageContent::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultContent> {
        match self {
            MessageContent::ToolResult(tool_result) => Some(tool_result),
            _ => None,
        }
    }

    pub fn as_thinking(&self) -> Option<&ThinkingContent> {
        match self {
            MessageContent::Thinking(thinking) => Some(thinking),
            _ => None,
        }
    }
}

impl From<Content> for MessageContent {
    fn from(content: Content) -> Self {
        match content {
            Content::Text(text) => MessageContent::Text(text),
            Content::Image(image) => MessageContent::Image(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message {
            role: Role::User,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add image content to the message
    pub fn with_image<S: Into<String>, T: Into<String>>(self, data: S, mime_type: T) -> Self {
        self.with_content(MessageContent::image(data, mime_type))
    }

    /// Add a tool use to the message
    pub fn with_tool_use<I: Into<String>, N: Into<String>>(
        self,
        id: I,
        name: N,
        input: Value,
    ) -> Self {
        self.with_content(MessageContent::tool_use(id, name, input))
    }

    /// Add a tool result to the message
    pub fn with_tool_result<S: Into<String>>(self, tool_use_id: S, content: Vec<Content>) -> Self {
        self.with_content(MessageContent::tool_result(tool_use_id, content))
    }

    /// Add a thinking block to the message
    pub fn with_thinking<T: Into<String>, S: Into<String>>(self, thinking: T, signature: S) -> Self {
        self.with_content(MessageContent::thinking(thinking, signature))
    }

    /// Add a user action wrapper to the message
    pub fn with_user_action(self, content: Vec<MessageContent>) -> Self {
        self.with_content(MessageContent::user_action(content))
    }

    /// True when every block is a UserAction wrapper; such messages bypass
    /// role-based grouping in the compilers. An empty message is vacuously
    /// all-user-action and compiles to nothing either way.
    pub fn is_user_action_only(&self) -> bool {
        self.content.iter().all(|block| block.is_user_action())
    }

    /// The inner blocks of every UserAction wrapper, flattened in order.
    pub fn user_action_blocks(&self) -> Vec<&MessageContent> {
        self.content
            .iter()
            .filter_map(|block| match block {
                MessageContent::UserAction(action) => Some(action.content.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders_preserve_block_order() {
        let message = Message::assistant()
            .with_text("first")
            .with_tool_use("call_1", "screenshot", json!({}))
            .with_text("second");

        assert_eq!(message.content.len(), 3);
        assert_eq!(message.content[0].as_text(), Some("first"));
        assert!(message.content[1].is_tool_use());
        assert_eq!(message.content[2].as_text(), Some("second"));
    }

    #[test]
    fn test_user_action_only() {
        let action = Message::user().with_user_action(vec![
            MessageContent::tool_use("call_1", "click_mouse", json!({"button": "left"})),
            MessageContent::image("abc", "image/png"),
        ]);
        assert!(action.is_user_action_only());
        assert_eq!(action.user_action_blocks().len(), 2);

        let mixed = Message::user()
            .with_user_action(vec![MessageContent::text("action")])
            .with_text("and a normal block");
        assert!(!mixed.is_user_action_only());
    }

    #[test]
    fn test_serde_tags() {
        let block = MessageContent::tool_result("call_9", vec![Content::text("done")]);
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "tool_result");
        assert_eq!(value["tool_use_id"], "call_9");

        let back: MessageContent = serde_json::from_value(value).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_accessors() {
        let result = MessageContent::tool_result(
            "call_9",
            vec![Content::text("done"), Content::image("aW1n", "image/png")],
        );
        let tool_result = result.as_tool_result().unwrap();
        assert_eq!(tool_result.tool_use_id, "call_9");
        assert_eq!(tool_result.content[0].as_text(), Some("done"));
        assert_eq!(
            tool_result.content[1].as_image(),
            Some(("aW1n", "image/png"))
        );
        assert!(result.as_tool_use().is_none());
        assert!(MessageContent::image("aW1n", "image/png").is_image());
    }

    #[test]
    fn test_thinking_round_trip() {
        let block = MessageContent::thinking("encrypted-payload", "rs_123");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "thinking");
        let back: MessageContent = serde_json::from_value(value).unwrap();
        assert_eq!(back.as_thinking().unwrap().signature, "rs_123");
    }
}
