use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory containing the input annotation (.TextGrid) files
    #[serde(default = "default_textgrid_dir")]
    pub textgrid_dir: PathBuf,

    /// Directory containing the input audio (.wav) files
    #[serde(default = "default_wav_dir")]
    pub wav_dir: PathBuf,

    /// Directory receiving the augmented annotation files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Text encoding used to read and write annotation files
    #[serde(default)]
    pub encoding: TextEncoding,

    /// How source tiers are bound to the sentence/word/vowel roles
    #[serde(default)]
    pub tier_binding: TierBinding,

    /// Names and inclusion of the generated tiers
    #[serde(default)]
    pub output_tiers: OutputTierConfig,

    /// Formant analysis parameters
    #[serde(default)]
    pub formant: FormantConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            textgrid_dir: default_textgrid_dir(),
            wav_dir: default_wav_dir(),
            output_dir: default_output_dir(),
            encoding: TextEncoding::default(),
            tier_binding: TierBinding::default(),
            output_tiers: OutputTierConfig::default(),
            formant: FormantConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Validate the configuration after loading and applying overrides
    pub fn validate(&self) -> Result<()> {
        if self.textgrid_dir.as_os_str().is_empty() {
            return Err(anyhow!("textgrid_dir must not be empty"));
        }
        if self.wav_dir.as_os_str().is_empty() {
            return Err(anyhow!("wav_dir must not be empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must not be empty"));
        }
        self.tier_binding.validate()?;
        self.output_tiers.validate()?;
        self.formant.validate()?;
        Ok(())
    }
}

/// Text encoding for annotation files
///
/// The original corpus convention is UTF-16; reads additionally honor a byte
/// order mark when one is present, whatever the configured default.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// 16-bit Unicode (little endian with BOM on write)
    #[default]
    Utf16,
    /// 8-bit Unicode
    Utf8,
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utf16 => write!(f, "utf16"),
            Self::Utf8 => write!(f, "utf8"),
        }
    }
}

/// Binding of source tiers to the sentence/word/vowel roles
///
/// The input files are expected to carry the three source tiers; the binding
/// is validated against the document instead of trusted silently. `position`
/// reproduces the historical layout (tiers 0/1/2), `name` binds by tier name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TierBinding {
    /// Bind tiers by position in the document
    Position {
        /// Index of the sentence tier
        #[serde(default = "default_sentence_index")]
        sentence: usize,
        /// Index of the word tier
        #[serde(default = "default_word_index")]
        word: usize,
        /// Index of the vowel tier
        #[serde(default = "default_vowel_index")]
        vowel: usize,
    },
    /// Bind tiers by name
    Name {
        /// Name of the sentence tier
        sentence: String,
        /// Name of the word tier
        word: String,
        /// Name of the vowel tier
        vowel: String,
    },
}

impl Default for TierBinding {
    fn default() -> Self {
        Self::Position {
            sentence: default_sentence_index(),
            word: default_word_index(),
            vowel: default_vowel_index(),
        }
    }
}

impl TierBinding {
    /// Validate the binding's internal consistency
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Position { sentence, word, vowel } => {
                if sentence == word || sentence == vowel || word == vowel {
                    return Err(anyhow!(
                        "tier_binding positions must be distinct (got {}, {}, {})",
                        sentence, word, vowel
                    ));
                }
            }
            Self::Name { sentence, word, vowel } => {
                if sentence.is_empty() || word.is_empty() || vowel.is_empty() {
                    return Err(anyhow!("tier_binding names must not be empty"));
                }
            }
        }
        Ok(())
    }
}

/// Names and inclusion of the tiers the batch generates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputTierConfig {
    /// Name of the duration interval tier
    #[serde(default = "default_length_name")]
    pub length_name: String,

    /// Name of the scratch timepoint tier
    #[serde(default = "default_point_name")]
    pub point_name: String,

    /// Name of the first formant tier
    #[serde(default = "default_f1_name")]
    pub f1_name: String,

    /// Name of the second formant tier
    #[serde(default = "default_f2_name")]
    pub f2_name: String,

    /// Name of the third formant tier
    #[serde(default = "default_f3_name")]
    pub f3_name: String,

    /// Whether the scratch timepoint tier is written to the output document.
    /// The historical output omits it; the tier is still built either way.
    #[serde(default)]
    pub include_point_tier: bool,
}

impl Default for OutputTierConfig {
    fn default() -> Self {
        Self {
            length_name: default_length_name(),
            point_name: default_point_name(),
            f1_name: default_f1_name(),
            f2_name: default_f2_name(),
            f3_name: default_f3_name(),
            include_point_tier: false,
        }
    }
}

impl OutputTierConfig {
    /// Validate tier names
    pub fn validate(&self) -> Result<()> {
        let names = [
            &self.length_name,
            &self.point_name,
            &self.f1_name,
            &self.f2_name,
            &self.f3_name,
        ];
        if names.iter().any(|n| n.is_empty()) {
            return Err(anyhow!("output tier names must not be empty"));
        }
        Ok(())
    }
}

/// Formant analysis parameters
///
/// The parameter surface follows the Burg analysis convention: time step,
/// formant count ceiling, frequency ceiling, window length and pre-emphasis
/// corner frequency.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FormantConfig {
    /// Analysis frame step in seconds; 0 selects a quarter window
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Maximum number of formants per frame
    #[serde(default = "default_max_formants")]
    pub max_formants: usize,

    /// Formant frequency ceiling in Hz
    #[serde(default = "default_max_formant_hz")]
    pub max_formant_hz: f64,

    /// Analysis window length in seconds
    #[serde(default = "default_window_length")]
    pub window_length: f64,

    /// Pre-emphasis corner frequency in Hz
    #[serde(default = "default_pre_emphasis_from")]
    pub pre_emphasis_from: f64,
}

impl Default for FormantConfig {
    fn default() -> Self {
        Self {
            time_step: default_time_step(),
            max_formants: default_max_formants(),
            max_formant_hz: default_max_formant_hz(),
            window_length: default_window_length(),
            pre_emphasis_from: default_pre_emphasis_from(),
        }
    }
}

impl FormantConfig {
    /// Effective frame step in seconds
    pub fn effective_time_step(&self) -> f64 {
        if self.time_step > 0.0 {
            self.time_step
        } else {
            self.window_length / 4.0
        }
    }

    /// Validate analysis parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_formants < 3 {
            return Err(anyhow!(
                "formant.max_formants must be at least 3 to measure F1..F3 (got {})",
                self.max_formants
            ));
        }
        if self.max_formants > 10 {
            return Err(anyhow!(
                "formant.max_formants must be at most 10 (got {})",
                self.max_formants
            ));
        }
        if !(self.max_formant_hz > 0.0) {
            return Err(anyhow!("formant.max_formant_hz must be positive"));
        }
        if !(self.window_length > 0.0) {
            return Err(anyhow!("formant.window_length must be positive"));
        }
        if self.time_step < 0.0 {
            return Err(anyhow!("formant.time_step must not be negative"));
        }
        if self.pre_emphasis_from < 0.0 {
            return Err(anyhow!("formant.pre_emphasis_from must not be negative"));
        }
        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_textgrid_dir() -> PathBuf {
    PathBuf::from("TextGrid")
}

fn default_wav_dir() -> PathBuf {
    PathBuf::from("wav")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("TextGridOutput")
}

fn default_sentence_index() -> usize {
    0
}

fn default_word_index() -> usize {
    1
}

fn default_vowel_index() -> usize {
    2
}

fn default_length_name() -> String {
    "Length".to_string()
}

fn default_point_name() -> String {
    "Point".to_string()
}

fn default_f1_name() -> String {
    "F1".to_string()
}

fn default_f2_name() -> String {
    "F2".to_string()
}

fn default_f3_name() -> String {
    "F3".to_string()
}

fn default_time_step() -> f64 {
    0.0 // quarter window
}

fn default_max_formants() -> usize {
    5
}

fn default_max_formant_hz() -> f64 {
    5500.0
}

fn default_window_length() -> f64 {
    0.025
}

fn default_pre_emphasis_from() -> f64 {
    50.0
}
