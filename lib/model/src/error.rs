use thiserror::Error;

/// An error raised while decoding a server response into a [ResultTable](crate::ResultTable).
///
/// A decode failure is deliberately distinct from an empty table: callers must never
/// present a payload they could not understand as a query that returned no rows.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The response carried a content type none of the decoders understand.
    #[error("unsupported response content type '{0}'")]
    UnsupportedContentType(String),
    /// The response body is not well-formed JSON.
    #[error("malformed response payload: {0}")]
    Syntax(#[from] serde_json::Error),
    /// The response is valid JSON but does not have the expected structure.
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl DecodeError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        DecodeError::UnexpectedShape(message.into())
    }
}
