use regex::Regex;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::models::content::ImageContent;

/// Render an image as a data URI, tolerating callers that already supplied
/// one. Base64 payloads arrive with embedded whitespace from some sources, so
/// it is stripped first; a bare payload with no recorded mime type is assumed
/// to be PNG.
pub fn image_data_uri(image: &ImageContent) -> String {
    let clean: String = image
        .data
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if clean.starts_with("data:image/") {
        return clean;
    }
    let mime_type = if image.mime_type.is_empty() {
        "image/png"
    } else {
        image.mime_type.as_str()
    };
    format!("data:{};base64,{}", mime_type, clean)
}

/// The textual rendering of a human-performed tool action, shared by every
/// protocol's user-action unwrap step.
pub fn user_action_text(name: &str, input: &Value) -> String {
    let rendered = serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
    format!("User performed action: {}\n{}", name, rendered)
}

pub fn sanitize_function_name(name: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    re.replace_all(name, "_").to_string()
}

/// Detect a context-length failure reported inside a chat-completion error
/// object, so it surfaces as a dedicated error instead of a generic one.
pub fn check_context_length_error(error: &Value) -> Option<ProviderError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ProviderError::ContextLengthExceeded(message))
    } else {
        None
    }
}
