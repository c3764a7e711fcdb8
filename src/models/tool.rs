use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool that can be used by a model.
///
/// `input_schema` is a restricted JSON Schema: `type` in {string, number,
/// integer, boolean, array, object}, with optional `description`, `enum`,
/// `nullable`, `items` for arrays, and `properties`/`required` for objects,
/// recursively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// Schema for the parameters the tool accepts
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}
