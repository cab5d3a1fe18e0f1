use crate::Format;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClickHouseError {
    /// The configured response format has no decoder.
    #[error("unsupported data format {0}: only JSON is supported")]
    UnsupportedFormat(Format),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status with the drained error body.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    /// Client-side brotli decoding failed.
    #[error("decompression error: {0}")]
    Decompress(std::io::Error),
    /// Response body is not the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// An insert row could not be serialized.
    #[error("encode error: {0}")]
    Encode(serde_json::Error),
}
