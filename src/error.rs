use std::string::String;
use std::sync::Arc;

use enough::StopReason;

/// Errors from stream sources, sinks and filters.
///
/// The type is `Clone` so that a failed stream can hand the same error back on
/// every later call (see [`crate::StickyError`]).
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("unexpected end of stream")]
    UnexpectedEnd,

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("unrecognized format magic bytes")]
    UnrecognizedFormat,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid pixel data: {0}")]
    InvalidData(String),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("transform worker panicked")]
    WorkerPanicked,

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl StreamError {
    /// Whether this error reports a stream that ended before its declared height.
    pub fn is_unexpected_end(&self) -> bool {
        matches!(self, StreamError::UnexpectedEnd)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return StreamError::UnexpectedEnd;
        }
        StreamError::Io(Arc::new(e))
    }
}

impl From<StopReason> for StreamError {
    fn from(r: StopReason) -> Self {
        StreamError::Cancelled(r)
    }
}
