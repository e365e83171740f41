//! Capture provider trait and error taxonomy.

use bytes::Bytes;
use pagewatch_core::TargetKind;

/// Errors that can occur while capturing a target.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("capture returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("no render service configured (CAPTURE_RENDERER_URL)")]
    NotConfigured,

    #[error("capture failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Produces a raw byte buffer for a target descriptor.
///
/// Implementations own their retry and timeout policy; callers treat a
/// returned error as the final verdict for this check.
#[async_trait::async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Capture the target: a rendered-page raster for pages, the raw
    /// image bytes for creatives.
    async fn capture(&self, kind: &TargetKind) -> Result<Bytes, CaptureError>;
}
