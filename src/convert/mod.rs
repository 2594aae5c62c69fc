//! Turning one input file into PDF pages

pub mod office;
pub mod slides;

use std::path::{Path, PathBuf};
use std::time::Duration;

use lopdf::Document;
use tracing::debug;

use crate::error::ConversionError;
use crate::input::{InputFile, InputKind};
use crate::pdf::compose_image_page;
use crate::workspace::Workspace;

pub use office::{DocumentConverter, OfficeConverter};
pub use slides::{export_presentation, AutomationSession, OfficeSlideApp, SlideDeckApp, SlideDeckSession};

/// Settings for the external converters
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Office suite executable used for Word and presentation inputs
    pub office_program: PathBuf,
    /// Longest a single external conversion may run
    pub timeout: Duration,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            office_program: PathBuf::from("soffice"),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Pages produced from one input, in their original order
#[derive(Debug)]
pub struct PageList {
    document: Document,
}

impl PageList {
    /// Load the pages of a PDF file
    pub fn load(path: &Path) -> Result<Self, ConversionError> {
        let document = Document::load(path)?;
        Ok(Self { document })
    }

    /// Load a converter's output, reporting a missing file as such
    fn load_converted(path: &Path) -> Result<Self, ConversionError> {
        if !path.is_file() {
            return Err(ConversionError::MissingOutput {
                path: path.to_path_buf(),
            });
        }
        Self::load(path)
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Everything a conversion needs besides the input itself
pub struct ConversionContext<'a> {
    /// Position of the input in the job, used to name intermediate files
    pub index: usize,
    pub workspace: &'a Workspace,
    pub documents: &'a dyn DocumentConverter,
    pub slides: &'a dyn SlideDeckApp,
}

impl InputFile {
    /// Produce this input's pages, converting through the strategy its kind
    /// calls for. Intermediate files go into the context's workspace.
    pub fn to_pdf_pages(&self, ctx: &ConversionContext<'_>) -> Result<PageList, ConversionError> {
        match &self.kind {
            InputKind::LegacyWord => Err(ConversionError::LegacyWord),
            InputKind::Unsupported(ext) => Err(ConversionError::Unsupported { ext: ext.clone() }),
            InputKind::Pdf => {
                self.ensure_exists()?;
                PageList::load(&self.path)
            }
            InputKind::Docx => {
                self.ensure_exists()?;
                let target = ctx.workspace.pdf_path_for(ctx.index, self);
                debug!("Converting Word document {} -> {}", self.display_name(), target.display());
                ctx.documents.convert(&self.path, &target)?;
                PageList::load_converted(&target)
            }
            InputKind::Presentation => {
                self.ensure_exists()?;
                let target = ctx.workspace.pdf_path_for(ctx.index, self);
                debug!("Exporting presentation {} -> {}", self.display_name(), target.display());
                let workdir = ctx.workspace.scratch_dir_for(ctx.index)?;
                export_presentation(ctx.slides, &workdir, &self.path, &target)?;
                PageList::load_converted(&target)
            }
            InputKind::Image(_) => {
                self.ensure_exists()?;
                let target = ctx.workspace.pdf_path_for(ctx.index, self);
                debug!("Composing image page {} -> {}", self.display_name(), target.display());
                compose_image_page(&self.path, &target)?;
                PageList::load_converted(&target)
            }
        }
    }

    /// Missing inputs fail before any converter is started
    fn ensure_exists(&self) -> Result<(), ConversionError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(ConversionError::NotFound(self.path.clone()))
        }
    }
}
