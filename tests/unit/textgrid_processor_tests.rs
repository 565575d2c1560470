/*!
 * Unit tests for the TextGrid document model and long-format codec
 */

use anyhow::Result;

use formantfill::app_config::TextEncoding;
use formantfill::errors::ProcessingError;
use formantfill::textgrid_processor::{
    Interval, IntervalTier, Point, PointTier, TextGrid, Tier, decode_text, encode_text,
    format_value, output_path_for,
};

use crate::common;

/// Parse the reference fixture and check the document shape
#[test]
fn test_parse_withThreeTierFixture_shouldYieldDocument() -> Result<()> {
    let content = common::sample_textgrid(2.0, &[(0.5, 0.7, "a"), (1.0, 1.4, "ai")]);
    let grid = TextGrid::parse_long_string(&content)?;

    assert_eq!(grid.xmin, 0.0);
    assert_eq!(grid.xmax, 2.0);
    assert_eq!(grid.tiers.len(), 3);
    assert_eq!(grid.tiers[0].name(), "sentence");
    assert_eq!(grid.tiers[1].name(), "word");
    assert_eq!(grid.tiers[2].name(), "vowel");

    let vowel = grid.tiers[2].as_interval().unwrap();
    // two labeled vowels plus the three gap intervals around them
    assert_eq!(vowel.intervals.len(), 5);
    let annotated = vowel.annotated_intervals();
    assert_eq!(annotated.len(), 2);
    assert_eq!(annotated[0].text, "a");
    assert_eq!(annotated[1].text, "ai");
    assert_eq!(annotated[1].xmin, 1.0);
    assert_eq!(annotated[1].xmax, 1.4);
    Ok(())
}

/// Non-TextGrid content is rejected up front
#[test]
fn test_parse_withForeignContent_shouldFail() {
    assert!(TextGrid::parse_long_string("1\n00:00:01,000 --> 00:00:02,000\nhi\n").is_err());
    assert!(TextGrid::parse_long_string("").is_err());

    let wrong_class = "File type = \"ooTextFile\"\nObject class = \"Pitch\"\n";
    assert!(TextGrid::parse_long_string(wrong_class).is_err());
}

/// format_long output parses back to an equal document
#[test]
fn test_roundtrip_withFormatAndParse_shouldPreserveDocument() -> Result<()> {
    let content = common::sample_textgrid(2.0, &[(0.5, 0.7, "a")]);
    let grid = TextGrid::parse_long_string(&content)?;

    let reparsed = TextGrid::parse_long_string(&grid.format_long())?;
    assert_eq!(grid, reparsed);
    Ok(())
}

/// Quotes inside labels are doubled on write and folded back on read
#[test]
fn test_roundtrip_withQuotedLabel_shouldEscape() -> Result<()> {
    let mut tier = IntervalTier::new("sentence", 0.0, 1.0);
    tier.add_interval(Interval::new(0.0, 1.0, "she said \"hi\" twice"))
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut grid = TextGrid::new(0.0, 1.0);
    grid.add_tier(Tier::Interval(tier));

    let rendered = grid.format_long();
    assert!(rendered.contains("\"she said \"\"hi\"\" twice\""));

    let reparsed = TextGrid::parse_long_string(&rendered)?;
    let interval = &reparsed.tiers[0].as_interval().unwrap().intervals[0];
    assert_eq!(interval.text, "she said \"hi\" twice");
    Ok(())
}

/// Labels spanning several lines survive the round trip
#[test]
fn test_roundtrip_withMultilineLabel_shouldPreserveNewlines() -> Result<()> {
    let mut tier = IntervalTier::new("sentence", 0.0, 1.0);
    tier.add_interval(Interval::new(0.0, 1.0, "first line\nsecond line"))
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut grid = TextGrid::new(0.0, 1.0);
    grid.add_tier(Tier::Interval(tier));

    let reparsed = TextGrid::parse_long_string(&grid.format_long())?;
    let interval = &reparsed.tiers[0].as_interval().unwrap().intervals[0];
    assert_eq!(interval.text, "first line\nsecond line");
    Ok(())
}

/// Point tiers round-trip through the TextTier class
#[test]
fn test_roundtrip_withPointTier_shouldPreservePoints() -> Result<()> {
    let mut tier = PointTier::new("F1", 0.0, 2.0);
    tier.add_point(Point::new(0.5, "512.000000"))
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    tier.add_point(Point::new(1.5, "498.000000"))
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut grid = TextGrid::new(0.0, 2.0);
    grid.add_tier(Tier::Point(tier));

    let rendered = grid.format_long();
    assert!(rendered.contains("class = \"TextTier\""));
    assert!(rendered.contains("points: size = 2"));

    let reparsed = TextGrid::parse_long_string(&rendered)?;
    assert_eq!(grid, reparsed);
    Ok(())
}

/// Interval tiers are exported contiguous over their span
#[test]
fn test_format_withSparseTier_shouldFillGaps() {
    let mut tier = IntervalTier::new("Length", 0.0, 2.0);
    tier.add_interval(Interval::new(0.5, 1.0, "0.500000")).unwrap();
    let filled = tier.with_gaps_filled();

    assert_eq!(filled.intervals.len(), 3);
    assert_eq!(filled.intervals[0].text, "");
    assert_eq!(filled.intervals[0].xmin, 0.0);
    assert_eq!(filled.intervals[0].xmax, 0.5);
    assert_eq!(filled.intervals[1].text, "0.500000");
    assert_eq!(filled.intervals[2].xmin, 1.0);
    assert_eq!(filled.intervals[2].xmax, 2.0);
}

/// Inserts that move backwards in time are rejected
#[test]
fn test_add_withDisorderedEntries_shouldFail() {
    let mut tier = IntervalTier::new("vowel", 0.0, 2.0);
    tier.add_interval(Interval::new(0.5, 1.0, "a")).unwrap();

    let overlap = tier.add_interval(Interval::new(0.8, 1.2, "e")).unwrap_err();
    assert!(matches!(overlap, ProcessingError::TierOrdering(_)));

    let inverted = tier.add_interval(Interval::new(1.5, 1.5, "e")).unwrap_err();
    assert!(matches!(inverted, ProcessingError::TierOrdering(_)));

    let mut points = PointTier::new("F1", 0.0, 2.0);
    points.add_point(Point::new(1.0, "")).unwrap();
    let stalled = points.add_point(Point::new(1.0, "")).unwrap_err();
    assert!(matches!(stalled, ProcessingError::TierOrdering(_)));
}

/// UTF-16 text survives an encode/decode round trip and carries a BOM
#[test]
fn test_encoding_withUtf16_shouldRoundTrip() -> Result<()> {
    let content = common::sample_textgrid(1.0, &[(0.2, 0.4, "aɪ")]);

    let bytes = encode_text(&content, TextEncoding::Utf16);
    assert_eq!(&bytes[..2], &[0xFF, 0xFE]);

    let decoded = decode_text(&bytes, TextEncoding::Utf16)?;
    assert_eq!(decoded, content);

    // a byte order mark overrides the configured default
    let sniffed = decode_text(&bytes, TextEncoding::Utf8)?;
    assert_eq!(sniffed, content);
    Ok(())
}

/// Malformed UTF-16 input is a decode error, not garbage output
#[test]
fn test_encoding_withMalformedBytes_shouldFail() {
    // lone high surrogate, little endian
    let bytes = [0x00, 0xD8, 0x41, 0x00, 0x42];
    assert!(decode_text(&bytes, TextEncoding::Utf16).is_err());
}

/// Encoding-aware file read/write round trip
#[test]
fn test_file_withUtf16RoundTrip_shouldPreserveDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = common::sample_textgrid(2.0, &[(0.5, 0.7, "a")]);
    let grid = TextGrid::parse_long_string(&content)?;

    let path = temp_dir.path().join("roundtrip.TextGrid");
    grid.write_file(&path, TextEncoding::Utf16)?;

    let raw = std::fs::read(&path)?;
    assert_eq!(&raw[..2], &[0xFF, 0xFE]);

    let reread = TextGrid::read_file(&path, TextEncoding::Utf16)?;
    assert_eq!(grid, reread);
    Ok(())
}

/// The fixed-point value convention uses 6 fractional digits
#[test]
fn test_format_value_shouldUseSixDigits() {
    assert_eq!(format_value(0.2), "0.200000");
    assert_eq!(format_value(1.2 - 1.0), "0.200000");
    assert_eq!(format_value(512.0), "512.000000");
    assert_eq!(format_value(f64::NAN), "NaN");
}

/// Output files keep the input file name under the output directory
#[test]
fn test_output_path_shouldKeepBasename() {
    let out = output_path_for("TextGrid/sample01.TextGrid", "TextGridOutput");
    assert_eq!(out, std::path::PathBuf::from("TextGridOutput/sample01.TextGrid"));
}
