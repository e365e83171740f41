//! The `Comparator` seam between the check pipeline and the diff engine.
//!
//! Pages and creatives share one check pipeline but use different
//! comparison strategies; the pipeline picks a comparator from the target
//! kind and never inspects pixels or hashes itself.

use pagewatch_core::TargetKind;
use serde::{Deserialize, Serialize};

use crate::error::DiffError;
use crate::hash;
use crate::pixel::{self, DEFAULT_CHANNEL_THRESHOLD};

/// Differing-pixel percentages for the whole raster and its two bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    pub overall: f64,
    pub first_view: f64,
    pub body: f64,
}

/// Output of a comparison, shaped by the comparator that produced it.
#[derive(Debug)]
pub enum DiffOutcome {
    /// Pixel-region comparison with band attribution and an optional
    /// PNG mask (absent on dimension mismatch).
    Pixel {
        metrics: RegionMetrics,
        diff_image: Option<Vec<u8>>,
    },
    /// Binary hash comparison.
    Hash { changed: bool },
}

/// Compares a previous baseline capture against a fresh one.
pub trait Comparator: Send + Sync {
    fn compare(&self, prev: &[u8], curr: &[u8]) -> Result<DiffOutcome, DiffError>;
}

/// Region-based pixel comparator for rendered pages.
#[derive(Debug, Clone, Copy)]
pub struct PixelComparator {
    pub threshold: u8,
}

impl Default for PixelComparator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CHANNEL_THRESHOLD,
        }
    }
}

impl Comparator for PixelComparator {
    fn compare(&self, prev: &[u8], curr: &[u8]) -> Result<DiffOutcome, DiffError> {
        let diff = pixel::compare_images(prev, curr, self.threshold)?;
        Ok(DiffOutcome::Pixel {
            metrics: diff.metrics,
            diff_image: diff.diff_image,
        })
    }
}

/// Content-hash comparator for static creatives.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashComparator;

impl Comparator for HashComparator {
    fn compare(&self, prev: &[u8], curr: &[u8]) -> Result<DiffOutcome, DiffError> {
        Ok(DiffOutcome::Hash {
            changed: hash::bytes_changed(prev, curr),
        })
    }
}

/// Pick the comparator for a target kind.
pub fn comparator_for(kind: &TargetKind) -> Box<dyn Comparator> {
    match kind {
        TargetKind::Page { .. } => Box::new(PixelComparator::default()),
        TargetKind::Creative { .. } => Box::new(HashComparator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_comparator_identity() {
        let outcome = HashComparator.compare(b"same", b"same").unwrap();
        assert!(matches!(outcome, DiffOutcome::Hash { changed: false }));
    }

    #[test]
    fn comparator_dispatch_by_kind() {
        let page = TargetKind::Page {
            url: "https://example.com".into(),
        };
        let creative = TargetKind::Creative {
            image_url: "https://cdn.example.com/a.png".into(),
            click_url: None,
        };
        // Hash comparator accepts arbitrary bytes; pixel comparator requires rasters.
        assert!(comparator_for(&creative).compare(b"a", b"a").is_ok());
        assert!(comparator_for(&page).compare(b"a", b"a").is_err());
    }
}
