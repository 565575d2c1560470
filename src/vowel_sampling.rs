use crate::app_config::OutputTierConfig;
use crate::errors::ProcessingError;
use crate::formant_analysis::FormantSource;
use crate::textgrid_processor::{format_value, Interval, IntervalTier, Point, PointTier};

// @module: Timepoint planning and measurement tier construction

/// Plan the sample timepoints for one labeled vowel interval.
///
/// The label's Unicode scalar count classifies the vowel: one symbol is a
/// monophthong sampled at the interval midpoint, two a diphthong sampled at
/// the quarter-points, three a triphthong sampled at quarter-points and
/// midpoint. The returned timepoints are strictly increasing and strictly
/// inside the interval. Any other symbol count is unsupported.
pub fn plan_sample_points(interval: &Interval) -> Result<Vec<f64>, ProcessingError> {
    let start = interval.xmin;
    let end = interval.xmax;
    let mid = start + (end - start) / 2.0;
    let left_mid = start + (end - start) / 4.0;
    let right_mid = end - (end - start) / 4.0;

    match interval.text.chars().count() {
        1 => Ok(vec![mid]),
        2 => Ok(vec![left_mid, right_mid]),
        3 => Ok(vec![left_mid, mid, right_mid]),
        symbols => Err(ProcessingError::UnsupportedLabelShape {
            label: interval.text.clone(),
            symbols,
        }),
    }
}

/// The tiers generated for one annotation file.
#[derive(Debug, Clone)]
pub struct VowelTiers {
    /// Duration of every vowel interval, as an interval tier
    pub length: IntervalTier,
    /// Untagged scratch points at every sampled timepoint
    pub point: PointTier,
    /// First formant frequencies at every sampled timepoint
    pub f1: PointTier,
    /// Second formant frequencies
    pub f2: PointTier,
    /// Third formant frequencies
    pub f3: PointTier,
}

/// Build the duration and formant tiers from the annotated vowel intervals.
///
/// Intervals are processed in stored order and every interval's timepoints
/// are increasing, so entries land in every output tier in monotonically
/// increasing time without re-sorting. The first planner or formant-source
/// failure aborts the whole build.
pub fn build_vowel_tiers(
    vowels: &[&Interval],
    formants: &dyn FormantSource,
    span: (f64, f64),
    names: &OutputTierConfig,
) -> Result<VowelTiers, ProcessingError> {
    let (xmin, xmax) = span;
    let mut tiers = VowelTiers {
        length: IntervalTier::new(names.length_name.clone(), xmin, xmax),
        point: PointTier::new(names.point_name.clone(), xmin, xmax),
        f1: PointTier::new(names.f1_name.clone(), xmin, xmax),
        f2: PointTier::new(names.f2_name.clone(), xmin, xmax),
        f3: PointTier::new(names.f3_name.clone(), xmin, xmax),
    };

    for interval in vowels {
        tiers.length.add_interval(Interval::new(
            interval.xmin,
            interval.xmax,
            format_value(interval.duration()),
        ))?;

        for time in plan_sample_points(interval)? {
            tiers.point.add_point(Point::new(time, ""))?;
            add_formants_at_time(formants, time, &mut tiers)?;
        }
    }

    Ok(tiers)
}

/// Query all three formants at one timepoint and append the formatted
/// values to the respective tiers.
fn add_formants_at_time(
    formants: &dyn FormantSource,
    time: f64,
    tiers: &mut VowelTiers,
) -> Result<(), ProcessingError> {
    let f1 = formants.value_at(1, time)?;
    let f2 = formants.value_at(2, time)?;
    let f3 = formants.value_at(3, time)?;
    tiers.f1.add_point(Point::new(time, format_value(f1)))?;
    tiers.f2.add_point(Point::new(time, format_value(f2)))?;
    tiers.f3.add_point(Point::new(time, format_value(f3)))?;
    Ok(())
}
