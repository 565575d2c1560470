/*!
 * Error types for the formantfill application.
 *
 * This module contains the per-file processing error kinds, using the
 * thiserror crate for ergonomic error definitions. The batch driver checks
 * these explicitly; no error here is fatal to a batch.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort the processing of a single annotation/audio pair.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// A vowel label encodes neither 1, 2, nor 3 symbols
    #[error("unsupported label shape: \"{label}\" has {symbols} symbols, only monophthongs, diphthongs and triphthongs are supported")]
    UnsupportedLabelShape {
        /// The offending interval label
        label: String,
        /// Unicode scalar count of the label
        symbols: usize,
    },

    /// The annotation file disappeared between listing and processing
    #[error("annotation file not found: {0:?}")]
    MissingAnnotationFile(PathBuf),

    /// No audio file shares the annotation file's basename
    #[error("no matching audio file: {0:?}")]
    MissingAudioFile(PathBuf),

    /// The annotation file could not be decoded or parsed
    #[error("failed to decode {path:?}: {reason}")]
    Decode {
        /// File that failed to decode
        path: PathBuf,
        /// Decoder or parser message
        reason: String,
    },

    /// A sample timepoint fell outside the analyzable audio range
    #[error("formant query at {time} s is outside the analyzable range {tmin} s .. {tmax} s")]
    QueryOutOfRange {
        /// Queried time
        time: f64,
        /// Start of the analyzable range
        tmin: f64,
        /// End of the analyzable range
        tmax: f64,
    },

    /// The configured tier binding does not match the document shape
    #[error("tier binding failed: {0}")]
    TierBinding(String),

    /// An entry was inserted out of time order
    #[error("tier ordering violated: {0}")]
    TierOrdering(String),

    /// The audio file could not be opened or has an unusable format
    #[error("audio error: {0}")]
    Audio(String),

    /// Error from a file operation
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for ProcessingError {
    fn from(error: hound::Error) -> Self {
        Self::Audio(error.to_string())
    }
}
