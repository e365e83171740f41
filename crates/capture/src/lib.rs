//! Capture provider contract and HTTP-based implementation.
//!
//! The engine consumes remote targets through the [`CaptureProvider`]
//! seam: rendered-page captures go through an external render service,
//! creative captures are plain image fetches. Browser mechanics live
//! entirely behind the render service.

pub mod http;
pub mod liveness;
pub mod provider;

pub use http::HttpCaptureProvider;
pub use liveness::{LivenessChecker, LivenessProbe, LivenessReport};
pub use provider::{CaptureError, CaptureProvider};
