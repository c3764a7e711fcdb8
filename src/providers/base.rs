use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderResult;
use crate::interrupt::InterruptSignal;
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for LLM backends.
///
/// Implementations own the transport call only; request bodies and response
/// blocks come from the pure per-protocol compile/parse functions. When the
/// interrupt signal fires mid-call the implementation must return
/// `ProviderError::Interrupted`, never a transport error.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message from the complete conversation history
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        interrupt: Option<&InterruptSignal>,
    ) -> ProviderResult<(Message, Usage)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_usage_creation() {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        assert_eq!(usage.input_tokens, Some(10));
        assert_eq!(usage.output_tokens, Some(20));
        assert_eq!(usage.total_tokens, Some(30));
    }

    #[test]
    fn test_usage_serialization() -> Result<()> {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let serialized = serde_json::to_string(&usage)?;
        let deserialized: Usage = serde_json::from_str(&serialized)?;

        assert_eq!(usage, deserialized);

        let json_value: serde_json::Value = serde_json::from_str(&serialized)?;
        assert_eq!(json_value["input_tokens"], json!(10));
        assert_eq!(json_value["output_tokens"], json!(20));
        assert_eq!(json_value["total_tokens"], json!(30));

        Ok(())
    }
}
