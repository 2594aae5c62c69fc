//! Merge orchestration: inputs in, one PDF out
//!
//! A merge job walks its inputs in order, converts each to PDF pages through
//! the strategy its kind calls for, and appends those pages to a single
//! accumulator. A failure on one input is recorded and the job moves on; only
//! a job that ends up with no pages at all, or cannot write its output,
//! fails as a whole. The job's temporary workspace is removed on every path.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::convert::{
    ConversionContext, ConverterConfig, DocumentConverter, OfficeConverter, OfficeSlideApp,
    SlideDeckApp,
};
use crate::error::{ConversionError, Error, Result};
use crate::input::InputFile;
use crate::pdf::PageAccumulator;
use crate::workspace::Workspace;

/// Options for merging
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// External converter settings
    pub converter: ConverterConfig,
    /// Directory to create the temporary workspace in (system temp dir if unset)
    pub temp_root: Option<PathBuf>,
}

/// Inputs in merge order plus the output path
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub inputs: Vec<InputFile>,
    pub output: PathBuf,
}

impl MergeJob {
    pub fn new<I, P>(inputs: I, output: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            inputs: inputs.into_iter().map(InputFile::new).collect(),
            output: output.into(),
        }
    }
}

/// What happened to one input
#[derive(Debug)]
pub enum FileOutcome {
    /// Pages were added to the output
    Appended { pages: usize },
    /// The input's type is not handled
    Skipped { reason: String },
    /// The input should have produced pages but did not
    Failed { error: ConversionError },
}

#[derive(Debug)]
pub struct FileReport {
    /// Position in the job's input list
    pub index: usize,
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileReport {
    /// Skipped, failed, or contributed no pages
    pub fn is_warning(&self) -> bool {
        !matches!(self.outcome, FileOutcome::Appended { pages } if pages > 0)
    }
}

/// Per-input record of a merge
#[derive(Debug, Default)]
pub struct MergeReport {
    pub files: Vec<FileReport>,
    /// Pages in the output (zero if nothing was written)
    pub total_pages: usize,
    /// Workspace the job used; it no longer exists once the job returns
    pub workspace: Option<PathBuf>,
}

impl MergeReport {
    /// Inputs that were skipped, failed or were empty
    pub fn warnings(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.is_warning())
    }

    /// Inputs that contributed pages
    pub fn merged_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Appended { pages } if pages > 0))
            .count()
    }
}

/// Result of a merge job
#[derive(Debug)]
pub struct MergeOutcome {
    pub output: PathBuf,
    pub result: Result<()>,
    pub report: MergeReport,
}

impl MergeOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    /// Human-readable summary of the job
    pub fn message(&self) -> String {
        match &self.result {
            Ok(()) => format!(
                "Merged {} file(s) ({} pages) into {}",
                self.report.merged_files(),
                self.report.total_pages,
                self.output.display()
            ),
            Err(e) => e.to_string(),
        }
    }

    /// `(success, message)` pair
    pub fn into_tuple(self) -> (bool, String) {
        (self.success(), self.message())
    }
}

/// Runs merge jobs with a fixed set of converters
pub struct Merger {
    options: MergeOptions,
    documents: Box<dyn DocumentConverter>,
    slides: Box<dyn SlideDeckApp>,
}

impl Merger {
    /// Merger using the office suite for Word and presentation inputs
    pub fn new(options: MergeOptions) -> Self {
        let documents = Box::new(OfficeConverter::new(&options.converter));
        let slides = Box::new(OfficeSlideApp::new(&options.converter));
        Self::with_converters(options, documents, slides)
    }

    /// Merger with caller-supplied converters
    pub fn with_converters(
        options: MergeOptions,
        documents: Box<dyn DocumentConverter>,
        slides: Box<dyn SlideDeckApp>,
    ) -> Self {
        Self {
            options,
            documents,
            slides,
        }
    }

    /// Run one job to completion
    pub fn run(&self, job: &MergeJob) -> MergeOutcome {
        let mut report = MergeReport::default();
        let result = self.run_job(job, &mut report);

        if let Err(e) = &result {
            error!("Merge into {} failed: {}", job.output.display(), e);
        }

        MergeOutcome {
            output: job.output.clone(),
            result,
            report,
        }
    }

    fn run_job(&self, job: &MergeJob, report: &mut MergeReport) -> Result<()> {
        if job.inputs.is_empty() {
            return Err(Error::NoInputs);
        }

        let workspace =
            Workspace::create(self.options.temp_root.as_deref()).map_err(Error::Workspace)?;
        report.workspace = Some(workspace.path().to_path_buf());

        let result = self.merge_into(job, &workspace, report);
        workspace.close();
        result
    }

    fn merge_into(&self, job: &MergeJob, workspace: &Workspace, report: &mut MergeReport) -> Result<()> {
        let total = job.inputs.len();
        info!("Merging {} file(s) into {}", total, job.output.display());

        let mut accumulator = PageAccumulator::new();

        for (index, input) in job.inputs.iter().enumerate() {
            info!("({}/{}) Processing {}", index + 1, total, input.display_name());

            let ctx = ConversionContext {
                index,
                workspace,
                documents: self.documents.as_ref(),
                slides: self.slides.as_ref(),
            };

            let outcome = match convert_and_append(input, &ctx, &mut accumulator) {
                Ok(pages) => {
                    if pages == 0 {
                        warn!("{} contains no pages", input.display_name());
                    } else {
                        debug!("Added {} page(s) from {}", pages, input.display_name());
                    }
                    FileOutcome::Appended { pages }
                }
                Err(e) if e.is_skip() => {
                    warn!("Skipping {}: {}", input.display_name(), e);
                    FileOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", input.display_name(), e);
                    FileOutcome::Failed { error: e }
                }
            };

            report.files.push(FileReport {
                index,
                path: input.path.clone(),
                outcome,
            });
        }

        if accumulator.is_empty() {
            return Err(Error::NoValidPages);
        }

        let pages = accumulator.page_count();
        write_contained(&job.output, || accumulator.write(&job.output))?;
        report.total_pages = pages;

        info!("Wrote {} page(s) to {}", pages, job.output.display());
        Ok(())
    }
}

/// Convert one input and append its pages. A panic inside a decoder or
/// converter is turned into an error for this input only.
fn convert_and_append(
    input: &InputFile,
    ctx: &ConversionContext<'_>,
    accumulator: &mut PageAccumulator,
) -> std::result::Result<usize, ConversionError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        let pages = input.to_pdf_pages(ctx)?;
        accumulator
            .append(pages.into_document())
            .map_err(ConversionError::Pdf)
    }))
    .unwrap_or_else(|payload| Err(ConversionError::Panicked(panic_message(payload.as_ref()))))
}

/// Run the output write, turning a panic into a write error for `output`
fn write_contained<F>(output: &Path, write: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    panic::catch_unwind(AssertUnwindSafe(write)).unwrap_or_else(|payload| {
        Err(Error::WriteOutput {
            path: output.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("panicked: {}", panic_message(payload.as_ref())),
            ),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Merge `file_list` into `output_filename` with the default converters.
///
/// Returns whether a PDF was written, and a message for the user.
///
/// # Example
///
/// ```no_run
/// let (ok, message) = docmerge::merge_files(
///     &["cover.png", "report.docx", "appendix.pdf"],
///     "handout.pdf",
/// );
/// println!("{}", message);
/// assert!(ok);
/// ```
pub fn merge_files<P: AsRef<Path>>(file_list: &[P], output_filename: impl AsRef<Path>) -> (bool, String) {
    let job = MergeJob::new(
        file_list.iter().map(|p| p.as_ref().to_path_buf()),
        output_filename.as_ref(),
    );
    Merger::new(MergeOptions::default()).run(&job).into_tuple()
}
