use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Failure reading or appending the published images file.
///
/// Fatal for a run: delivering more images without being able to record
/// them would re-send them on the next run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Published images file error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The value would not read back as the same line, so recording it could
    /// never stop it from being sent again.
    #[error("Cannot record {url:?}: blank, padded or spans several lines")]
    Unstorable { url: String },
}
