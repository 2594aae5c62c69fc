//! docmerge CLI tool
//!
//! A command-line tool for merging PDFs, Word documents, slide decks and
//! images into one PDF.

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use docmerge::pdf::extract_metadata;
use docmerge::{expand_inputs, ConverterConfig, FileOutcome, MergeJob, MergeOptions, Merger};

/// docmerge - Merge PDF, Word, PowerPoint and image files into one PDF
#[derive(Parser)]
#[command(name = "docmerge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge a cover image, a report and an appendix, in that order
    docmerge merge -o handout.pdf cover.png report.docx appendix.pdf

    # Merge numbered files in order
    docmerge merge -o deck.pdf \"[0-9]*.pptx\"

    # Merge and open result
    docmerge merge -o output.pdf --open file1.pdf photo.jpg

    # Open inputs with their default applications before merging
    docmerge preview report.docx slides.pptx")]
struct Cli {
    /// Increase log output (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge files into one PDF
    Merge {
        /// Input files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Office suite executable for .docx, .ppt and .pptx inputs
        #[arg(long, default_value = "soffice")]
        office: PathBuf,

        /// Seconds a single office conversion may take
        #[arg(long, default_value_t = 300)]
        timeout: u64,

        /// Directory for the temporary workspace
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Open files with their default applications
    Preview {
        /// Files to open. Supports glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Merge {
            inputs,
            output,
            office,
            timeout,
            temp_dir,
            open,
        } => {
            let options = MergeOptions {
                converter: ConverterConfig {
                    office_program: office,
                    timeout: Duration::from_secs(timeout),
                },
                temp_root: temp_dir,
            };
            cmd_merge(inputs, output, options, open)
        }
        Commands::Preview { inputs } => cmd_preview(inputs),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Log to stderr. `RUST_LOG` wins over the -v count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Open a file with the system default application
fn open_file(path: &Path) -> anyhow::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Merge inputs into one PDF
fn cmd_merge(
    inputs: Vec<String>,
    output: PathBuf,
    options: MergeOptions,
    open: bool,
) -> anyhow::Result<()> {
    let inputs = expand_inputs(&inputs)?;
    let job = MergeJob::new(inputs, output.clone());

    let outcome = Merger::new(options).run(&job);

    for file in outcome.report.warnings() {
        match &file.outcome {
            FileOutcome::Skipped { reason } => {
                eprintln!("  skipped {}: {}", file.path.display(), reason)
            }
            FileOutcome::Failed { error } => {
                eprintln!("  failed  {}: {}", file.path.display(), error)
            }
            FileOutcome::Appended { .. } => {
                eprintln!("  empty   {}: contains no pages", file.path.display())
            }
        }
    }

    let (success, message) = outcome.into_tuple();
    if !success {
        bail!(message);
    }
    eprintln!("{}", message);

    if open {
        open_file(&output)
            .with_context(|| format!("Could not open {}", output.display()))?;
    }

    Ok(())
}

/// Open each input with its default application
fn cmd_preview(inputs: Vec<String>) -> anyhow::Result<()> {
    let inputs = expand_inputs(&inputs)?;
    let mut opened = 0;

    for path in &inputs {
        if !path.exists() {
            warn!("File not found: {}", path.display());
            continue;
        }
        match open_file(path) {
            Ok(()) => opened += 1,
            Err(e) => warn!("Could not open {}: {}", path.display(), e),
        }
    }

    if opened == 0 {
        bail!("None of the {} file(s) could be opened", inputs.len());
    }
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> anyhow::Result<()> {
    let metadata = extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    for (i, (width, height)) in metadata.page_sizes.iter().enumerate() {
        println!("  Page {}: {:.0} x {:.0} pt", i + 1, width, height);
    }

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    if let Some(producer) = metadata.producer {
        println!("Producer: {}", producer);
    }

    Ok(())
}
