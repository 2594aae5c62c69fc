//! Error types for the docmerge library

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Job-level errors. Any of these ends a merge without producing output.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty input list
    #[error("No files selected for merging")]
    NoInputs,

    /// Temporary workspace could not be created
    #[error("Failed to create temporary workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// Every input was skipped or failed
    #[error("No valid pages to merge")]
    NoValidPages,

    /// Output could not be serialized or moved into place
    #[error("Failed to write output file {}: {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// General error
    #[error("{0}")]
    General(String),
}

/// Per-file errors. The merge records these and moves on to the next input.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file type '{ext}'")]
    Unsupported { ext: String },

    #[error("legacy Word format (.doc) is not supported, convert it to .docx first")]
    LegacyWord,

    #[error("could not start converter '{}': {source}", .program.display())]
    ToolUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("converter '{}' exited with {status}: {stderr}", .program.display())]
    ToolFailed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("converter '{}' did not finish within {seconds}s", .program.display())]
    Timeout { program: PathBuf, seconds: u64 },

    #[error("conversion produced no output at {}", .path.display())]
    MissingOutput { path: PathBuf },

    #[error("slide deck automation failed: {0}")]
    Automation(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("converter panicked: {0}")]
    Panicked(String),
}

impl ConversionError {
    /// Whether the input was skipped by type rather than failing to convert.
    pub fn is_skip(&self) -> bool {
        matches!(self, ConversionError::Unsupported { .. } | ConversionError::LegacyWord)
    }
}
