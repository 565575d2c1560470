use std::path::Path;

use anyhow::{Result, anyhow};
use log::{error, info};

use crate::app_config::{Config, TierBinding};
use crate::errors::ProcessingError;
use crate::file_utils::FileManager;
use crate::formant_analysis::Sound;
use crate::textgrid_processor::{IntervalTier, TextGrid, Tier, output_path_for};
use crate::vowel_sampling::build_vowel_tiers;

// @module: Batch driver pairing annotation and audio files

/// Extension of the annotation files the batch consumes
pub const TEXTGRID_EXTENSION: &str = "TextGrid";
/// Extension of the paired audio files
pub const WAV_EXTENSION: &str = "wav";

/// Outcome counts of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Annotation files found
    pub total: usize,
    /// Files processed and written
    pub succeeded: usize,
    /// Files aborted by a per-file error
    pub failed: usize,
}

/// Drives the batch: enumerates annotation files, pairs audio by basename,
/// runs the per-file pipeline and isolates failures per file.
pub struct Controller {
    config: Config,
}

impl Controller {
    /// Create a controller over a validated configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Controller { config })
    }

    /// The configuration this controller runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole batch.
    ///
    /// Files are processed one at a time in sorted-name order. A failing
    /// file is reported on the error stream and skipped; the batch itself
    /// only fails on startup problems (missing input directory, unreadable
    /// listing).
    pub fn run(&self) -> Result<BatchSummary> {
        if !FileManager::dir_exists(&self.config.textgrid_dir) {
            return Err(anyhow!(
                "annotation directory does not exist: {}",
                self.config.textgrid_dir.display()
            ));
        }

        FileManager::ensure_dir(&self.config.output_dir)?;

        let files =
            FileManager::find_files_sorted(&self.config.textgrid_dir, TEXTGRID_EXTENSION)?;
        println!("Processing {} files", files.len());

        let mut summary = BatchSummary { total: files.len(), succeeded: 0, failed: 0 };
        for (index, path) in files.iter().enumerate() {
            let basename = FileManager::basename(path);
            println!("{}. Processing file {}", index + 1, basename);

            match self.process_file(path, &basename) {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    error!("{}. Error while processing file {}: {}", index + 1, basename, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    /// Process a single annotation/audio pair.
    ///
    /// Nothing is written unless the whole build succeeds, so a failing
    /// file never leaves a partial output document behind.
    pub fn process_file(&self, textgrid_path: &Path, basename: &str) -> Result<(), ProcessingError> {
        if !FileManager::file_exists(textgrid_path) {
            return Err(ProcessingError::MissingAnnotationFile(
                textgrid_path.to_path_buf(),
            ));
        }
        let wav_path = FileManager::paired_path(&self.config.wav_dir, basename, WAV_EXTENSION);
        if !FileManager::file_exists(&wav_path) {
            return Err(ProcessingError::MissingAudioFile(wav_path));
        }

        let grid = TextGrid::read_file(textgrid_path, self.config.encoding).map_err(|e| {
            ProcessingError::Decode {
                path: textgrid_path.to_path_buf(),
                reason: format!("{e:#}"),
            }
        })?;
        let (sentence, word, vowel) = self.bind_source_tiers(&grid)?;

        let sound = Sound::from_wav_file(&wav_path)?;
        let formants = sound.to_formant_burg(&self.config.formant)?;

        let vowels = vowel.annotated_intervals();
        let built = build_vowel_tiers(
            &vowels,
            &formants,
            (grid.xmin, grid.xmax),
            &self.config.output_tiers,
        )?;

        let mut output = TextGrid::new(grid.xmin, grid.xmax);
        output.add_tier(Tier::Interval(sentence.clone()));
        output.add_tier(Tier::Interval(word.clone()));
        output.add_tier(Tier::Interval(vowel.clone()));
        output.add_tier(Tier::Interval(built.length));
        if self.config.output_tiers.include_point_tier {
            output.add_tier(Tier::Point(built.point));
        }
        output.add_tier(Tier::Point(built.f1));
        output.add_tier(Tier::Point(built.f2));
        output.add_tier(Tier::Point(built.f3));

        let out_path = output_path_for(textgrid_path, &self.config.output_dir);
        output
            .write_file(&out_path, self.config.encoding)
            .map_err(|e| ProcessingError::Io(std::io::Error::other(format!("{e:#}"))))?;
        Ok(())
    }

    /// Resolve the sentence/word/vowel tiers per the configured binding.
    fn bind_source_tiers<'a>(
        &self,
        grid: &'a TextGrid,
    ) -> Result<(&'a IntervalTier, &'a IntervalTier, &'a IntervalTier), ProcessingError> {
        match &self.config.tier_binding {
            TierBinding::Position { sentence, word, vowel } => Ok((
                interval_tier_at(grid, *sentence, "sentence")?,
                interval_tier_at(grid, *word, "word")?,
                interval_tier_at(grid, *vowel, "vowel")?,
            )),
            TierBinding::Name { sentence, word, vowel } => Ok((
                interval_tier_named(grid, sentence, "sentence")?,
                interval_tier_named(grid, word, "word")?,
                interval_tier_named(grid, vowel, "vowel")?,
            )),
        }
    }
}

fn interval_tier_at<'a>(
    grid: &'a TextGrid,
    index: usize,
    role: &str,
) -> Result<&'a IntervalTier, ProcessingError> {
    let tier = grid.tiers.get(index).ok_or_else(|| {
        ProcessingError::TierBinding(format!(
            "{role} tier expects position {index} but the document has {} tiers",
            grid.tiers.len()
        ))
    })?;
    tier.as_interval().ok_or_else(|| {
        ProcessingError::TierBinding(format!(
            "{role} tier at position {index} (\"{}\") is not an interval tier",
            tier.name()
        ))
    })
}

fn interval_tier_named<'a>(
    grid: &'a TextGrid,
    name: &str,
    role: &str,
) -> Result<&'a IntervalTier, ProcessingError> {
    let tier = grid
        .tiers
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| {
            ProcessingError::TierBinding(format!(
                "{role} tier named \"{name}\" not found in the document"
            ))
        })?;
    tier.as_interval().ok_or_else(|| {
        ProcessingError::TierBinding(format!(
            "{role} tier named \"{name}\" is not an interval tier"
        ))
    })
}
