use thiserror::Error;

/// Wire-level failures. Distinct from [`mud_core::GameError`]: these
/// are transport/framing problems, not gameplay rule violations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    Closed,
    #[error("frame exceeded {0} bytes")]
    FrameTooLarge(usize),
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
