use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context, anyhow};
use encoding_rs::{Encoding, UTF_8, UTF_16LE};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::TextEncoding;
use crate::errors::ProcessingError;

// @module: TextGrid document model and long-format codec

// @const: `key = number` line
static NUMERIC_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([A-Za-z]+)\s*=\s*(-?[0-9][0-9.eE+-]*)\s*$"#).unwrap()
});

// @const: `key = "opening` line (value may continue on following lines)
static STRING_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([A-Za-z]+)\s*=\s*"(.*)$"#).unwrap()
});

// @const: `key: size = n` line
static SIZE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([A-Za-z]+):\s*size\s*=\s*([0-9]+)\s*$"#).unwrap()
});

// @const: structural `item [..]:` / `intervals [..]:` / `points [..]:` line
static STRUCTURAL_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*[A-Za-z]+\s*\[[0-9]*\]\s*:\s*$"#).unwrap()
});

/// Two times closer than this are the same boundary.
const TIME_EPSILON: f64 = 1e-10;

/// A labeled span of time within an interval tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// Start time in seconds
    pub xmin: f64,
    /// End time in seconds
    pub xmax: f64,
    /// Label text (empty for unannotated gaps)
    pub text: String,
}

impl Interval {
    /// Creates a new interval without validation
    pub fn new(xmin: f64, xmax: f64, text: impl Into<String>) -> Self {
        Interval { xmin, xmax, text: text.into() }
    }

    /// Duration of the interval in seconds
    pub fn duration(&self) -> f64 {
        self.xmax - self.xmin
    }
}

/// An instantaneous mark within a point tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Timestamp in seconds
    pub time: f64,
    /// Mark text (may be empty)
    pub mark: String,
}

impl Point {
    /// Creates a new point
    pub fn new(time: f64, mark: impl Into<String>) -> Self {
        Point { time, mark: mark.into() }
    }
}

/// Ordered sequence of intervals under a tier name and span.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTier {
    /// Tier name
    pub name: String,
    /// Tier start time
    pub xmin: f64,
    /// Tier end time
    pub xmax: f64,
    /// Stored intervals, in time order
    pub intervals: Vec<Interval>,
}

impl IntervalTier {
    /// Creates an empty interval tier spanning `[xmin, xmax]`
    pub fn new(name: impl Into<String>, xmin: f64, xmax: f64) -> Self {
        IntervalTier { name: name.into(), xmin, xmax, intervals: Vec::new() }
    }

    /// Appends an interval, enforcing a positive span and time order
    pub fn add_interval(&mut self, interval: Interval) -> Result<(), ProcessingError> {
        if !(interval.xmin < interval.xmax) {
            return Err(ProcessingError::TierOrdering(format!(
                "interval on tier \"{}\" has xmin {} >= xmax {}",
                self.name, interval.xmin, interval.xmax
            )));
        }
        if let Some(last) = self.intervals.last() {
            if interval.xmin < last.xmax - TIME_EPSILON {
                return Err(ProcessingError::TierOrdering(format!(
                    "interval at {} on tier \"{}\" overlaps previous interval ending at {}",
                    interval.xmin, self.name, last.xmax
                )));
            }
        }
        self.intervals.push(interval);
        Ok(())
    }

    /// Intervals carrying a non-empty label, in stored order.
    ///
    /// Unannotated gap intervals exist in files written by annotation tools
    /// but are not part of the annotation itself; processing iterates only
    /// the annotated ones.
    pub fn annotated_intervals(&self) -> Vec<&Interval> {
        self.intervals.iter().filter(|i| !i.text.is_empty()).collect()
    }

    /// Copy of the tier with empty intervals inserted so that the intervals
    /// cover `[xmin, xmax]` contiguously, as the long layout requires.
    pub fn with_gaps_filled(&self) -> IntervalTier {
        let mut filled = IntervalTier::new(self.name.clone(), self.xmin, self.xmax);
        let mut cursor = self.xmin;
        for interval in &self.intervals {
            if interval.xmin > cursor + TIME_EPSILON {
                filled.intervals.push(Interval::new(cursor, interval.xmin, ""));
            }
            filled.intervals.push(interval.clone());
            cursor = interval.xmax;
        }
        if self.xmax > cursor + TIME_EPSILON {
            filled.intervals.push(Interval::new(cursor, self.xmax, ""));
        }
        filled
    }
}

/// Ordered sequence of points under a tier name and span.
#[derive(Debug, Clone, PartialEq)]
pub struct PointTier {
    /// Tier name
    pub name: String,
    /// Tier start time
    pub xmin: f64,
    /// Tier end time
    pub xmax: f64,
    /// Stored points, in time order
    pub points: Vec<Point>,
}

impl PointTier {
    /// Creates an empty point tier spanning `[xmin, xmax]`
    pub fn new(name: impl Into<String>, xmin: f64, xmax: f64) -> Self {
        PointTier { name: name.into(), xmin, xmax, points: Vec::new() }
    }

    /// Appends a point, enforcing strictly increasing timestamps
    pub fn add_point(&mut self, point: Point) -> Result<(), ProcessingError> {
        if let Some(last) = self.points.last() {
            if point.time <= last.time + TIME_EPSILON {
                return Err(ProcessingError::TierOrdering(format!(
                    "point at {} on tier \"{}\" does not advance past previous point at {}",
                    point.time, self.name, last.time
                )));
            }
        }
        self.points.push(point);
        Ok(())
    }
}

/// A named track within a TextGrid document.
#[derive(Debug, Clone, PartialEq)]
pub enum Tier {
    /// Interval-based tier
    Interval(IntervalTier),
    /// Point-based tier (class "TextTier" in the long layout)
    Point(PointTier),
}

impl Tier {
    /// Tier name
    pub fn name(&self) -> &str {
        match self {
            Tier::Interval(t) => &t.name,
            Tier::Point(t) => &t.name,
        }
    }

    /// Tier start time
    pub fn xmin(&self) -> f64 {
        match self {
            Tier::Interval(t) => t.xmin,
            Tier::Point(t) => t.xmin,
        }
    }

    /// Tier end time
    pub fn xmax(&self) -> f64 {
        match self {
            Tier::Interval(t) => t.xmax,
            Tier::Point(t) => t.xmax,
        }
    }

    /// The interval tier inside, if this is one
    pub fn as_interval(&self) -> Option<&IntervalTier> {
        match self {
            Tier::Interval(t) => Some(t),
            Tier::Point(_) => None,
        }
    }
}

/// A tiered annotation document with a global time span.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGrid {
    /// Document start time
    pub xmin: f64,
    /// Document end time
    pub xmax: f64,
    /// Ordered tiers
    pub tiers: Vec<Tier>,
}

impl TextGrid {
    /// Creates an empty document spanning `[xmin, xmax]`
    pub fn new(xmin: f64, xmax: f64) -> Self {
        TextGrid { xmin, xmax, tiers: Vec::new() }
    }

    /// Appends a tier to the document
    pub fn add_tier(&mut self, tier: Tier) {
        self.tiers.push(tier);
    }

    /// Read a document from a file in the long textual layout.
    ///
    /// A byte order mark, when present, overrides the configured encoding.
    pub fn read_file<P: AsRef<Path>>(path: P, encoding: TextEncoding) -> Result<TextGrid> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read annotation file: {}", path.display()))?;
        let content = decode_text(&bytes, encoding)
            .with_context(|| format!("Failed to decode annotation file: {}", path.display()))?;
        Self::parse_long_string(&content)
            .with_context(|| format!("Failed to parse annotation file: {}", path.display()))
    }

    /// Write the document to a file in the long textual layout.
    ///
    /// Interval tiers are exported gap-filled so that every tier covers its
    /// span contiguously. The parent directory is created if needed.
    pub fn write_file<P: AsRef<Path>>(&self, path: P, encoding: TextEncoding) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let bytes = encode_text(&self.format_long(), encoding);
        fs::write(path, bytes)
            .with_context(|| format!("Failed to write annotation file: {}", path.display()))
    }

    /// Parse the long textual layout
    pub fn parse_long_string(content: &str) -> Result<TextGrid> {
        let mut cursor = LineCursor::new(content);

        let header = cursor.next_raw().ok_or_else(|| anyhow!("empty document"))?;
        if !header.contains("ooTextFile") {
            return Err(anyhow!("not an ooTextFile document: {:?}", header.trim()));
        }
        let class = cursor.next_raw().ok_or_else(|| anyhow!("missing object class"))?;
        if !class.contains("TextGrid") {
            return Err(anyhow!("not a TextGrid document: {:?}", class.trim()));
        }

        let xmin = cursor.next_numeric("xmin")?;
        let xmax = cursor.next_numeric("xmax")?;
        let mut grid = TextGrid::new(xmin, xmax);

        let tiers_line = cursor
            .find_containing("tiers?")
            .ok_or_else(|| anyhow!("missing tiers? line"))?;
        if !tiers_line.contains("<exists>") {
            return Ok(grid);
        }

        let tier_count = cursor.next_numeric("size")? as usize;
        for _ in 0..tier_count {
            let class = cursor.next_string("class")?;
            let name = cursor.next_string("name")?;
            let tier_xmin = cursor.next_numeric("xmin")?;
            let tier_xmax = cursor.next_numeric("xmax")?;

            match class.as_str() {
                "IntervalTier" => {
                    let size = cursor.next_size("intervals")?;
                    let mut tier = IntervalTier::new(name, tier_xmin, tier_xmax);
                    for _ in 0..size {
                        let ixmin = cursor.next_numeric("xmin")?;
                        let ixmax = cursor.next_numeric("xmax")?;
                        let text = cursor.next_string("text")?;
                        tier.add_interval(Interval::new(ixmin, ixmax, text))
                            .map_err(|e| anyhow!("{e}"))?;
                    }
                    grid.add_tier(Tier::Interval(tier));
                }
                "TextTier" | "PointTier" => {
                    let size = cursor.next_size("points")?;
                    let mut tier = PointTier::new(name, tier_xmin, tier_xmax);
                    for _ in 0..size {
                        let time = cursor.next_numeric("number")?;
                        let mark = cursor.next_string("mark")?;
                        tier.add_point(Point::new(time, mark))
                            .map_err(|e| anyhow!("{e}"))?;
                    }
                    grid.add_tier(Tier::Point(tier));
                }
                other => return Err(anyhow!("unsupported tier class: {:?}", other)),
            }
        }

        Ok(grid)
    }

    /// Render the long textual layout
    pub fn format_long(&self) -> String {
        let mut out = String::new();
        out.push_str("File type = \"ooTextFile\"\n");
        out.push_str("Object class = \"TextGrid\"\n");
        out.push('\n');
        out.push_str(&format!("xmin = {}\n", format_time(self.xmin)));
        out.push_str(&format!("xmax = {}\n", format_time(self.xmax)));
        if self.tiers.is_empty() {
            out.push_str("tiers? <absent>\n");
            return out;
        }
        out.push_str("tiers? <exists>\n");
        out.push_str(&format!("size = {}\n", self.tiers.len()));
        out.push_str("item []:\n");
        for (index, tier) in self.tiers.iter().enumerate() {
            out.push_str(&format!("    item [{}]:\n", index + 1));
            match tier {
                Tier::Interval(tier) => {
                    let filled = tier.with_gaps_filled();
                    out.push_str("        class = \"IntervalTier\"\n");
                    out.push_str(&format!("        name = \"{}\"\n", escape_text(&filled.name)));
                    out.push_str(&format!("        xmin = {}\n", format_time(filled.xmin)));
                    out.push_str(&format!("        xmax = {}\n", format_time(filled.xmax)));
                    out.push_str(&format!("        intervals: size = {}\n", filled.intervals.len()));
                    for (k, interval) in filled.intervals.iter().enumerate() {
                        out.push_str(&format!("        intervals [{}]:\n", k + 1));
                        out.push_str(&format!("            xmin = {}\n", format_time(interval.xmin)));
                        out.push_str(&format!("            xmax = {}\n", format_time(interval.xmax)));
                        out.push_str(&format!("            text = \"{}\"\n", escape_text(&interval.text)));
                    }
                }
                Tier::Point(tier) => {
                    out.push_str("        class = \"TextTier\"\n");
                    out.push_str(&format!("        name = \"{}\"\n", escape_text(&tier.name)));
                    out.push_str(&format!("        xmin = {}\n", format_time(tier.xmin)));
                    out.push_str(&format!("        xmax = {}\n", format_time(tier.xmax)));
                    out.push_str(&format!("        points: size = {}\n", tier.points.len()));
                    for (k, point) in tier.points.iter().enumerate() {
                        out.push_str(&format!("        points [{}]:\n", k + 1));
                        out.push_str(&format!("            number = {}\n", format_time(point.time)));
                        out.push_str(&format!("            mark = \"{}\"\n", escape_text(&point.mark)));
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for TextGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "TextGrid [{}, {}]", self.xmin, self.xmax)?;
        for tier in &self.tiers {
            let (class, len) = match tier {
                Tier::Interval(t) => ("IntervalTier", t.intervals.len()),
                Tier::Point(t) => ("TextTier", t.points.len()),
            };
            writeln!(f, "  {} \"{}\": {} entries", class, tier.name(), len)?;
        }
        Ok(())
    }
}

/// Decode annotation file bytes under the configured default encoding.
///
/// A byte order mark, when present, takes precedence.
pub fn decode_text(bytes: &[u8], default: TextEncoding) -> Result<String> {
    let encoding: &'static Encoding = match default {
        TextEncoding::Utf16 => UTF_16LE,
        TextEncoding::Utf8 => UTF_8,
    };
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(anyhow!("malformed {} byte sequence", used.name()));
    }
    Ok(text.into_owned())
}

/// Encode annotation text under the configured encoding.
///
/// UTF-16 output is little endian and carries a byte order mark, matching
/// the corpus convention the input files use.
pub fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf16 => {
            let mut bytes = Vec::with_capacity(2 + text.len() * 2);
            bytes.extend_from_slice(&[0xFF, 0xFE]);
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            bytes
        }
    }
}

/// Fixed-point text for durations and formant values, 6 fractional digits
pub fn format_value(value: f64) -> String {
    format!("{:.6}", value)
}

fn format_time(value: f64) -> String {
    format!("{}", value)
}

fn escape_text(text: &str) -> String {
    text.replace('"', "\"\"")
}

/// Sequential reader over the lines of a long-layout document.
struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(content: &'a str) -> Self {
        LineCursor { lines: content.lines().collect(), pos: 0 }
    }

    /// Next non-empty line, consumed unconditionally
    fn next_raw(&mut self) -> Option<&'a str> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
        None
    }

    /// Skip blank and structural lines, stopping at the next content line
    fn skip_structural(&mut self) {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            if line.is_empty() || STRUCTURAL_LINE_REGEX.is_match(line) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Consume the next content line, which must be `key = <number>`
    fn next_numeric(&mut self, key: &str) -> Result<f64> {
        self.skip_structural();
        let line = self
            .lines
            .get(self.pos)
            .copied()
            .ok_or_else(|| anyhow!("unexpected end of document, expected \"{key}\""))?;
        let caps = NUMERIC_LINE_REGEX
            .captures(line)
            .ok_or_else(|| anyhow!("expected \"{key} = <number>\", found {:?}", line.trim()))?;
        if &caps[1] != key {
            return Err(anyhow!("expected key \"{key}\", found {:?}", line.trim()));
        }
        self.pos += 1;
        caps[2]
            .parse::<f64>()
            .with_context(|| format!("invalid number for \"{key}\": {:?}", &caps[2]))
    }

    /// Consume the next content line, which must be `key: size = <n>`
    fn next_size(&mut self, key: &str) -> Result<usize> {
        self.skip_structural();
        let line = self
            .lines
            .get(self.pos)
            .copied()
            .ok_or_else(|| anyhow!("unexpected end of document, expected \"{key}: size\""))?;
        let caps = SIZE_LINE_REGEX
            .captures(line)
            .ok_or_else(|| anyhow!("expected \"{key}: size = <n>\", found {:?}", line.trim()))?;
        if &caps[1] != key {
            return Err(anyhow!("expected key \"{key}\", found {:?}", line.trim()));
        }
        self.pos += 1;
        caps[2]
            .parse::<usize>()
            .with_context(|| format!("invalid size for \"{key}\": {:?}", &caps[2]))
    }

    /// Consume the next content line(s), which must hold `key = "<text>"`.
    ///
    /// Values may span lines; a quote inside a value is doubled.
    fn next_string(&mut self, key: &str) -> Result<String> {
        self.skip_structural();
        let line = self
            .lines
            .get(self.pos)
            .copied()
            .ok_or_else(|| anyhow!("unexpected end of document, expected \"{key}\""))?;
        let caps = STRING_LINE_REGEX
            .captures(line)
            .ok_or_else(|| anyhow!("expected \"{key} = \\\"...\\\"\", found {:?}", line.trim()))?;
        if &caps[1] != key {
            return Err(anyhow!("expected key \"{key}\", found {:?}", line.trim()));
        }
        self.pos += 1;

        let mut value = String::new();
        let mut rest: String = caps[2].to_string();
        loop {
            let mut chars = rest.chars().peekable();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        value.push('"');
                    } else {
                        closed = true;
                        break;
                    }
                } else {
                    value.push(c);
                }
            }
            if closed {
                return Ok(value);
            }
            // unterminated: the value continues on the next physical line
            let continuation = self
                .lines
                .get(self.pos)
                .copied()
                .ok_or_else(|| anyhow!("unterminated string for \"{key}\""))?;
            self.pos += 1;
            value.push('\n');
            rest = continuation.to_string();
        }
    }

    /// Consume lines until one contains `needle`, returning it
    fn find_containing(&mut self, needle: &str) -> Option<&'a str> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if line.contains(needle) {
                return Some(line);
            }
        }
        None
    }
}

/// Resolve an output path for a processed annotation file: same basename,
/// same extension, under the output directory.
pub fn output_path_for<P1: AsRef<Path>, P2: AsRef<Path>>(input: P1, output_dir: P2) -> PathBuf {
    let file_name = input
        .as_ref()
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    output_dir.as_ref().join(file_name)
}
