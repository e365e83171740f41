//! Change classification over diff metrics.
//!
//! Maps raw differing-pixel percentages (or the binary hash signal) to a
//! change category and a changed/unchanged decision. Thresholds are in
//! percentage points of differing pixels.

use pagewatch_core::ChangeCategory;

use crate::comparator::{DiffOutcome, RegionMetrics};

/// Overall percentages below this are unchanged.
pub const NO_CHANGE_THRESHOLD: f64 = 3.0;
/// Band percentage above which a band is considered materially changed.
pub const BAND_THRESHOLD: f64 = 5.0;
/// One band must exceed the other by this factor to attribute the change.
pub const DOMINANCE_RATIO: f64 = 2.0;

/// Classifier decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub changed: bool,
    pub category: ChangeCategory,
}

/// Classify a comparison outcome.
pub fn classify(outcome: &DiffOutcome) -> Classification {
    match outcome {
        DiffOutcome::Hash { changed: false } => Classification {
            changed: false,
            category: ChangeCategory::NoChange,
        },
        DiffOutcome::Hash { changed: true } => Classification {
            changed: true,
            category: ChangeCategory::Content,
        },
        DiffOutcome::Pixel { metrics, .. } => classify_regions(metrics),
    }
}

/// Classify region metrics from the pixel comparator.
pub fn classify_regions(m: &RegionMetrics) -> Classification {
    if m.overall < NO_CHANGE_THRESHOLD {
        return Classification {
            changed: false,
            category: ChangeCategory::NoChange,
        };
    }

    let category = if m.first_view > BAND_THRESHOLD
        && m.body < BAND_THRESHOLD
        && m.first_view > DOMINANCE_RATIO * m.body
    {
        ChangeCategory::FirstView
    } else if m.body > BAND_THRESHOLD
        && m.first_view < BAND_THRESHOLD
        && m.body > DOMINANCE_RATIO * m.first_view
    {
        ChangeCategory::Body
    } else if m.first_view > BAND_THRESHOLD && m.body > BAND_THRESHOLD {
        ChangeCategory::WholePage
    } else {
        ChangeCategory::Minor
    };

    Classification {
        changed: true,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(overall: f64, first_view: f64, body: f64) -> RegionMetrics {
        RegionMetrics {
            overall,
            first_view,
            body,
        }
    }

    #[test]
    fn below_three_percent_is_no_change() {
        let c = classify_regions(&metrics(2.9, 2.9, 2.9));
        assert!(!c.changed);
        assert_eq!(c.category, ChangeCategory::NoChange);
    }

    #[test]
    fn no_change_regardless_of_band_ratio() {
        // Both bands below 3%: always "no change" whatever their ratio.
        for fv in [0.0, 0.5, 1.0, 2.0, 2.9] {
            for body in [0.0, 0.1, 1.5, 2.9] {
                let overall = (fv + body) / 2.0;
                let c = classify_regions(&metrics(overall, fv, body));
                assert!(!c.changed, "fv={fv} body={body}");
            }
        }
    }

    #[test]
    fn first_view_dominant_change() {
        let c = classify_regions(&metrics(10.0, 12.0, 2.0));
        assert!(c.changed);
        assert_eq!(c.category, ChangeCategory::FirstView);
    }

    #[test]
    fn body_dominant_change() {
        let c = classify_regions(&metrics(10.0, 2.0, 12.0));
        assert!(c.changed);
        assert_eq!(c.category, ChangeCategory::Body);
    }

    #[test]
    fn both_bands_changed_is_whole_page() {
        let c = classify_regions(&metrics(20.0, 18.0, 22.0));
        assert!(c.changed);
        assert_eq!(c.category, ChangeCategory::WholePage);
    }

    #[test]
    fn between_thresholds_is_minor() {
        let c = classify_regions(&metrics(4.0, 4.0, 4.0));
        assert!(c.changed);
        assert_eq!(c.category, ChangeCategory::Minor);
    }

    #[test]
    fn dominance_ratio_required_for_band_attribution() {
        // First-view above 5% but not double the body: minor, not first-view.
        let c = classify_regions(&metrics(5.5, 6.0, 4.0));
        assert!(c.changed);
        assert_eq!(c.category, ChangeCategory::Minor);
    }

    #[test]
    fn hash_outcomes_are_binary() {
        let unchanged = classify(&DiffOutcome::Hash { changed: false });
        assert!(!unchanged.changed);
        assert_eq!(unchanged.category, ChangeCategory::NoChange);

        let changed = classify(&DiffOutcome::Hash { changed: true });
        assert!(changed.changed);
        assert_eq!(changed.category, ChangeCategory::Content);
    }
}
