//! docmerge Library
//!
//! Merges PDF, Word (`.docx`), PowerPoint (`.ppt`/`.pptx`) and image
//! (`.jpg`/`.jpeg`/`.png`) files into a single PDF.
//! This library provides functionality to:
//! - Classify inputs by extension
//! - Convert Word documents and slide decks through an office suite
//! - Compose single-page PDFs from images, one point per pixel
//! - Accumulate pages in input order and write the result atomically
//! - Extract metadata (page counts, page sizes) from PDFs
//!
//! Inputs that cannot be used are skipped with a warning; the merge fails
//! only when no pages at all could be collected.
//!
//! # Example
//!
//! ```no_run
//! use docmerge::{MergeJob, MergeOptions, Merger};
//!
//! let job = MergeJob::new(
//!     vec!["1. intro.pdf", "2. slides.pptx", "3. photo.jpg"],
//!     "merged.pdf",
//! );
//!
//! let outcome = Merger::new(MergeOptions::default()).run(&job);
//! for warning in outcome.report.warnings() {
//!     eprintln!("{}: {:?}", warning.path.display(), warning.outcome);
//! }
//! println!("{}", outcome.message());
//! ```

pub mod error;
pub mod input;
pub mod workspace;
pub mod pdf;
pub mod convert;
pub mod merger;

// Re-export commonly used items
pub use error::{ConversionError, Error, Result};
pub use input::{expand_inputs, ImageFormat, InputFile, InputKind};
pub use convert::ConverterConfig;
pub use merger::{
    merge_files, FileOutcome, FileReport, MergeJob, MergeOptions, MergeOutcome, MergeReport,
    Merger,
};
