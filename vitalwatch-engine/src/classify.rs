//! Threshold classification of a single reading.

use vitalwatch_types::{Classification, Thresholds};

/// Classify a reading against a threshold set.
///
/// Each flag is computed independently; an unset bound never fires. With
/// `ignore_zero` set, a zero reading clears every flag. A NaN reading
/// compares false against every bound.
pub fn classify(value: f64, thresholds: &Thresholds) -> Classification {
    if thresholds.ignore_zero && value == 0.0 {
        return Classification::CLEAR;
    }

    Classification {
        at_or_below_low: thresholds.warning_low.is_some_and(|low| value <= low),
        at_or_above_high: thresholds.warning_high.is_some_and(|high| value >= high),
        at_or_below_critical_low: thresholds.critical_low.is_some_and(|low| value <= low),
        at_or_above_critical_high: thresholds.critical_high.is_some_and(|high| value >= high),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hr() -> Thresholds {
        Thresholds::new().warning(60.0, 100.0).critical(40.0, 150.0)
    }

    #[test]
    fn normal_reading_is_clear() {
        assert!(classify(72.0, &hr()).is_clear());
    }

    #[test]
    fn bounds_are_inclusive() {
        let at_low = classify(60.0, &hr());
        assert!(at_low.at_or_below_low);
        assert!(!at_low.at_or_below_critical_low);

        let at_high = classify(100.0, &hr());
        assert!(at_high.at_or_above_high);
        assert!(!at_high.at_or_above_critical_high);

        assert!(classify(40.0, &hr()).at_or_below_critical_low);
        assert!(classify(150.0, &hr()).at_or_above_critical_high);
    }

    #[test]
    fn flags_are_independent() {
        let c = classify(35.0, &hr());
        assert!(c.at_or_below_low);
        assert!(c.at_or_below_critical_low);
        assert!(!c.at_or_above_high);
        assert!(!c.at_or_above_critical_high);

        let c = classify(160.0, &hr());
        assert!(c.at_or_above_high);
        assert!(c.at_or_above_critical_high);
    }

    #[test]
    fn unset_bounds_never_fire() {
        let only_low = Thresholds {
            warning_low: Some(90.0),
            ..Default::default()
        };
        let c = classify(1_000_000.0, &only_low);
        assert!(c.is_clear());

        let c = classify(-1_000_000.0, &Thresholds::new());
        assert!(c.is_clear());
    }

    #[test]
    fn ignore_zero_clears_all_flags() {
        let thresholds = hr().ignoring_zero();
        assert!(classify(0.0, &thresholds).is_clear());
        assert!(classify(-0.0, &thresholds).is_clear());

        // Only exact zero is exempt.
        assert!(classify(0.5, &thresholds).at_or_below_critical_low);

        // Without the flag zero is just a very low reading.
        assert!(classify(0.0, &hr()).at_or_below_critical_low);
    }

    #[test]
    fn nan_is_clear() {
        assert!(classify(f64::NAN, &hr()).is_clear());
    }

    #[test]
    fn repeated_calls_agree() {
        let thresholds = hr();
        let first = classify(55.0, &thresholds);
        for _ in 0..100 {
            classify(170.0, &thresholds);
            assert_eq!(classify(55.0, &thresholds), first);
        }
    }
}
