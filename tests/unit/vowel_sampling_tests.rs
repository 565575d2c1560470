/*!
 * Unit tests for timepoint planning and measurement tier construction
 */

use formantfill::app_config::OutputTierConfig;
use formantfill::errors::ProcessingError;
use formantfill::textgrid_processor::Interval;
use formantfill::vowel_sampling::{build_vowel_tiers, plan_sample_points};

use crate::common::mock_formants::MockFormantSource;

const TIME_TOLERANCE: f64 = 1e-12;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TIME_TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

/// A 1-symbol label samples exactly the arithmetic midpoint
#[test]
fn test_plan_withMonophthong_shouldReturnMidpoint() {
    let interval = Interval::new(1.0, 1.2, "a");
    let points = plan_sample_points(&interval).unwrap();

    assert_eq!(points.len(), 1);
    assert_close(points[0], 1.1);
}

/// A 2-symbol label samples both quarter-points, in order
#[test]
fn test_plan_withDiphthong_shouldReturnQuarterPoints() {
    let interval = Interval::new(2.0, 2.4, "ai");
    let points = plan_sample_points(&interval).unwrap();

    assert_eq!(points.len(), 2);
    assert_close(points[0], 2.1);
    assert_close(points[1], 2.3);
    assert!(points[0] < points[1]);
    assert!(points.iter().all(|&t| t > 2.0 && t < 2.4));
}

/// A 3-symbol label samples quarter-points and midpoint, increasing
#[test]
fn test_plan_withTriphthong_shouldReturnThreeIncreasingPoints() {
    let interval = Interval::new(0.0, 1.0, "aia");
    let points = plan_sample_points(&interval).unwrap();

    assert_eq!(points.len(), 3);
    assert_close(points[0], 0.25);
    assert_close(points[1], 0.5);
    assert_close(points[2], 0.75);
    assert!(points[0] < points[1] && points[1] < points[2]);
}

/// Symbol counting is per Unicode scalar, not per byte
#[test]
fn test_plan_withMultibyteLabel_shouldCountSymbols() {
    let interval = Interval::new(0.0, 0.4, "aɪ");
    let points = plan_sample_points(&interval).unwrap();

    assert_eq!(points.len(), 2);
    assert_close(points[0], 0.1);
    assert_close(points[1], 0.3);
}

/// Labels with 0 or 4+ symbols are unsupported shapes
#[test]
fn test_plan_withUnsupportedLabels_shouldFail() {
    let empty = plan_sample_points(&Interval::new(0.0, 1.0, "")).unwrap_err();
    assert!(matches!(
        empty,
        ProcessingError::UnsupportedLabelShape { symbols: 0, .. }
    ));

    let long = plan_sample_points(&Interval::new(0.0, 1.0, "aeio")).unwrap_err();
    assert!(matches!(
        long,
        ProcessingError::UnsupportedLabelShape { symbols: 4, .. }
    ));
}

/// One monophthong interval yields a duration entry and one sample in
/// every formant tier
#[test]
fn test_build_withMonophthong_shouldFillAllTiers() {
    let vowel = Interval::new(1.0, 1.2, "a");
    let vowels = vec![&vowel];
    let source = MockFormantSource::new(500.0, 1500.0, 2500.0);
    let names = OutputTierConfig::default();

    let tiers = build_vowel_tiers(&vowels, &source, (0.0, 2.0), &names).unwrap();

    assert_eq!(tiers.length.intervals.len(), 1);
    assert_eq!(tiers.length.intervals[0].text, "0.200000");
    assert_close(tiers.length.intervals[0].xmin, 1.0);
    assert_close(tiers.length.intervals[0].xmax, 1.2);

    assert_eq!(tiers.point.points.len(), 1);
    assert_close(tiers.point.points[0].time, 1.1);
    assert_eq!(tiers.point.points[0].mark, "");

    assert_eq!(tiers.f1.points.len(), 1);
    assert_eq!(tiers.f1.points[0].mark, "500.000000");
    assert_eq!(tiers.f2.points[0].mark, "1500.000000");
    assert_eq!(tiers.f3.points[0].mark, "2500.000000");

    // every formant queried exactly once, at the midpoint
    let queries = source.recorded_queries();
    assert_eq!(queries.len(), 3);
    for (expected_formant, (formant, time)) in (1usize..=3).zip(queries) {
        assert_eq!(formant, expected_formant);
        assert_close(time, 1.1);
    }
}

/// Entries across all output tiers advance monotonically in time across
/// intervals
#[test]
fn test_build_withMultipleIntervals_shouldStayMonotonic() {
    let first = Interval::new(1.0, 1.2, "a");
    let second = Interval::new(2.0, 2.4, "ai");
    let vowels = vec![&first, &second];
    let source = MockFormantSource::new(500.0, 1500.0, 2500.0);
    let names = OutputTierConfig::default();

    let tiers = build_vowel_tiers(&vowels, &source, (0.0, 3.0), &names).unwrap();

    let times: Vec<f64> = tiers.f1.points.iter().map(|p| p.time).collect();
    assert_eq!(times.len(), 3);
    assert_close(times[0], 1.1);
    assert_close(times[1], 2.1);
    assert_close(times[2], 2.3);
    assert!(times.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(tiers.point.points.len(), 3);
    assert_eq!(tiers.length.intervals.len(), 2);
    assert_eq!(tiers.length.intervals[1].text, "0.400000");
}

/// The first unsupported label aborts the whole build
#[test]
fn test_build_withBadLabel_shouldAbort() {
    let good = Interval::new(0.0, 0.5, "a");
    let bad = Interval::new(1.0, 1.5, "aeiou");
    let vowels = vec![&good, &bad];
    let source = MockFormantSource::new(500.0, 1500.0, 2500.0);
    let names = OutputTierConfig::default();

    let err = build_vowel_tiers(&vowels, &source, (0.0, 2.0), &names).unwrap_err();
    assert!(matches!(
        err,
        ProcessingError::UnsupportedLabelShape { symbols: 5, .. }
    ));
}

/// A formant query outside the analyzable range aborts the build
#[test]
fn test_build_withQueryOutOfRange_shouldAbort() {
    let vowel = Interval::new(1.0, 1.2, "a");
    let vowels = vec![&vowel];
    let source = MockFormantSource::new(500.0, 1500.0, 2500.0).with_range(0.0, 1.0);
    let names = OutputTierConfig::default();

    let err = build_vowel_tiers(&vowels, &source, (0.0, 2.0), &names).unwrap_err();
    assert!(matches!(err, ProcessingError::QueryOutOfRange { .. }));
}
