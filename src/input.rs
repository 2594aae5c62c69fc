//! Input file classification by extension

use std::fmt;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::warn;

use crate::error::{Error, Result};

/// Raster formats accepted as single-page inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// What kind of input a file is, derived from its lower-cased extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// `.pdf`, appended as-is
    Pdf,
    /// `.docx`, converted by an external document converter
    Docx,
    /// `.ppt` / `.pptx`, exported through a slide deck automation session
    Presentation,
    /// `.jpg` / `.jpeg` / `.png`, composed into a page sized to the image
    Image(ImageFormat),
    /// `.doc`, recognized but not supported
    LegacyWord,
    /// Anything else. Holds the lower-cased extension (empty if none).
    Unsupported(String),
}

impl InputKind {
    /// Classify a path by its extension. Case is ignored.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => InputKind::Pdf,
            "docx" => InputKind::Docx,
            "ppt" | "pptx" => InputKind::Presentation,
            "jpg" | "jpeg" => InputKind::Image(ImageFormat::Jpeg),
            "png" => InputKind::Image(ImageFormat::Png),
            "doc" => InputKind::LegacyWord,
            _ => InputKind::Unsupported(ext),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Pdf => write!(f, "PDF"),
            InputKind::Docx => write!(f, "Word document"),
            InputKind::Presentation => write!(f, "presentation"),
            InputKind::Image(ImageFormat::Jpeg) => write!(f, "JPEG image"),
            InputKind::Image(ImageFormat::Png) => write!(f, "PNG image"),
            InputKind::LegacyWord => write!(f, "legacy Word document"),
            InputKind::Unsupported(ext) if ext.is_empty() => write!(f, "file without extension"),
            InputKind::Unsupported(ext) => write!(f, ".{} file", ext),
        }
    }
}

/// One input of a merge job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub kind: InputKind,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = InputKind::from_path(&path);
        Self { path, kind }
    }

    /// File name for log messages
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// File stem used to name intermediate PDFs
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string())
    }
}

/// Expand glob patterns in command-line inputs.
///
/// Each pattern expands in sorted order; the order between arguments is the
/// order the user gave, since it decides the page order of the merge.
/// Arguments without glob characters are taken literally.
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !(pattern.contains('*') || pattern.contains('?') || pattern.contains('[')) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob(pattern).map_err(|e| Error::InvalidGlob(format!("{}: {}", pattern, e)))?;
        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => matched.push(path),
                Err(e) => warn!("Glob error for {}: {}", pattern, e),
            }
        }
        if matched.is_empty() {
            // Literal file names may contain brackets, e.g. "notes [draft].pdf"
            if Path::new(pattern).exists() {
                paths.push(PathBuf::from(pattern));
                continue;
            }
            return Err(Error::NoFilesMatched(pattern.to_string()));
        }
        matched.sort();
        paths.extend(matched);
    }

    Ok(paths)
}
