//! These models represent the objects passed around by the agent
//!
//! There are several different related formats we need to interact with:
//! - chat-completion messages/tools, sent from the agent to the LLM
//! - structured-response items/tools, sent from the agent to the LLM
//! - function-calling schemas and contents, sent from the agent to the LLM
//!
//! These all overlap to varying degrees: they group content differently
//! (per-message vs per-item), correlate tool calls differently, and disagree
//! on what a reasoning payload looks like. We always immediately convert wire
//! data into the internal structs using the per-protocol compile/parse
//! helpers. Because of the need for compatibility, the internal models are
//! not an exact match to any one wire format.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
