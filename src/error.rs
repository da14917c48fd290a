use thiserror::Error;

/// Main error type for the packaging pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No conversion strategy for {0}")]
    NoConversionPath(String),

    #[error("Sample rate {0} Hz has no ADTS frequency table entry")]
    UnsupportedAdtsRate(u32),

    #[error("Payload of {0} bytes overflows the 13-bit ADTS frame-length field")]
    PacketTooLarge(usize),

    #[error("Container error: {0}")]
    Container(String),
}

/// Errors reported by a block codec collaborator.
///
/// These are hard failures only; the "no more output" / end-of-stream
/// sentinels are expressed as `Ok(None)` from `receive_packet`, never as
/// an error variant.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Codec not found: {0}")]
    NotFound(String),

    #[error("Failed to open codec: {0}")]
    OpenFailed(String),

    #[error("Codec not initialized")]
    NotInitialized,

    #[error("Codec already initialized")]
    AlreadyInitialized,

    #[error("Encode call failed: {0}")]
    EncodeFailed(String),

    #[error("Drain call failed: {0}")]
    DrainFailed(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PipelineError>;
