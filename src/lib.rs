/*!
 * # formantfill
 *
 * A Rust tool for batch vowel formant measurement over paired Praat
 * TextGrid annotations and wav recordings.
 *
 * ## Features
 *
 * - Read TextGrid annotation documents in the long textual layout
 *   (UTF-16 by default, UTF-8 supported)
 * - Sample F1/F2/F3 at the midpoint of monophthongs, the quarter-points of
 *   diphthongs and both for triphthongs
 * - LPC formant estimation with Burg's method over mono wav input
 * - Augment each document with duration and formant tiers and write it
 *   under the same basename
 * - Per-file failure isolation: one malformed pair never stops the batch
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `textgrid_processor`: TextGrid document model and long-format codec
 * - `formant_analysis`: Audio loading and formant estimation
 * - `vowel_sampling`: Timepoint planning and measurement tier construction
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod formant_analysis;
pub mod textgrid_processor;
pub mod vowel_sampling;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BatchSummary, Controller};
pub use errors::ProcessingError;
pub use formant_analysis::{FormantSource, FormantTrack, Sound};
pub use textgrid_processor::{Interval, IntervalTier, Point, PointTier, TextGrid, Tier};
pub use vowel_sampling::{build_vowel_tiers, plan_sample_points};
