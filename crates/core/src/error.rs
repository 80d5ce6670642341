//! Errors raised while building model values.

/// Errors that can occur when constructing or decoding model values.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Weekday code outside 0..=6
    #[error("invalid weekday code {0}, expected 0 (Sunday) to 6 (Saturday)")]
    InvalidWeekdayCode(u8),

    /// Snapshot document could not be decoded
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}
