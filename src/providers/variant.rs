use regex::Regex;
use serde_json::Value;

use super::base::Usage;
use super::{chat, responses};
use crate::models::message::{Message, MessageContent};
use crate::models::tool::Tool;

/// The two OpenAI-compatible wire protocols and how to pick between them.
///
/// A variant is a {compile, parse} pair: once detected from the model id,
/// every call site goes through its methods rather than re-branching on the
/// model string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVariant {
    /// Single ordered list of role-tagged messages (gpt-4o, gpt-3.5-turbo, ...)
    Chat,
    /// Flat ordered item list with typed items (o-series, gpt-4.1+)
    Responses,
}

impl ApiVariant {
    /// Detect which protocol a model id speaks. Pure and recomputed on every
    /// call; unrecognized ids default to the chat protocol.
    pub fn detect(model: &str) -> ApiVariant {
        // o-series: o1, o3, o4-mini, ...
        if Regex::new(r"^o\d").unwrap().is_match(model) {
            return ApiVariant::Responses;
        }
        // gpt-4.1 and later families (gpt-4.1, gpt-5, ...)
        if Regex::new(r"^gpt-([5-9]|4\.[1-9])").unwrap().is_match(model) {
            return ApiVariant::Responses;
        }
        ApiVariant::Chat
    }

    pub fn build_request(
        &self,
        model: &str,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        tools_enabled: bool,
    ) -> Value {
        match self {
            ApiVariant::Chat => chat::build_request(model, system, messages, tools, tools_enabled),
            ApiVariant::Responses => {
                responses::build_request(model, system, messages, tools, tools_enabled)
            }
        }
    }

    pub fn parse_response(&self, response: &Value) -> (Vec<MessageContent>, Usage) {
        match self {
            ApiVariant::Chat => chat::response_to_content(response),
            ApiVariant::Responses => responses::response_to_content(response),
        }
    }

    pub fn endpoint_path(&self) -> &'static str {
        match self {
            ApiVariant::Chat => "/v1/chat/completions",
            ApiVariant::Responses => "/v1/responses",
        }
    }
}
