use thiserror::Error;

/// Errors reported by the chord space engine.
///
/// Every operation is a deterministic pure function of its inputs, so a
/// failed call fails identically when repeated; nothing is retried or
/// silently recovered.
#[derive(Debug, Error)]
pub enum ChordSpaceError {
    /// Malformed chord text or an unknown chord name.
    #[error("format error: {0}")]
    Format(String),

    /// Operands outside an operation's domain: voice-count mismatch,
    /// mismatched spaces, an empty chord where K >= 1 is required, or an
    /// unsupported PITV configuration.
    #[error("domain error: {0}")]
    Domain(String),

    /// An index or coordinate outside its declared bounds. Never clamped.
    #[error("range error: {0}")]
    Range(String),
}

pub type Result<T> = std::result::Result<T, ChordSpaceError>;
