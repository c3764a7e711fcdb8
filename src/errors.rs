use thiserror::Error;

/// Errors surfaced by the transport providers.
///
/// Malformed tool arguments and unsupported response items are deliberately
/// absent here: both are recovered inside the inbound parsers and handed back
/// to the agent as diagnostic text blocks, so a bad backend reply never aborts
/// a turn.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The caller's interrupt signal fired while the request was in flight.
    /// Always surfaced as this variant so retry logic can special-case it.
    #[error("Request interrupted")]
    Interrupted,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Context length exceeded. Message: {0}")]
    ContextLengthExceeded(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
