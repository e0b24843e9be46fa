use thiserror::Error;

/// Failures surfaced by the analysis core.
///
/// A run either returns a complete result or one of these; partially filled
/// buffers are never handed back.
#[derive(Debug, Error)]
pub enum SpectrogramError {
    /// Invalid analysis parameters, detected before any work starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The PCM input is unusable (no channels, non-finite samples, undecodable file).
    #[error("decode error: {0}")]
    Decode(String),

    /// Allocation or bounds failure during analysis or remapping.
    #[error("processing error: {0}")]
    Processing(String),
}

impl From<symphonia::core::errors::Error> for SpectrogramError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        SpectrogramError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for SpectrogramError {
    fn from(err: std::io::Error) -> Self {
        SpectrogramError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SpectrogramError>;
