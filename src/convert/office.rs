//! Word document conversion through an external office process

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::convert::ConverterConfig;
use crate::error::ConversionError;

/// How often a running converter is polled for completion
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Converts a word-processing document into a PDF file.
pub trait DocumentConverter {
    /// Convert `input` to a PDF at `output`.
    ///
    /// Returning `Ok` does not guarantee `output` exists; callers check.
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError>;
}

/// `DocumentConverter` backed by a headless office suite (`soffice`)
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    program: PathBuf,
    timeout: Duration,
}

impl OfficeConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            program: config.office_program.clone(),
            timeout: config.timeout,
        }
    }
}

impl DocumentConverter for OfficeConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        let profile = temp_dir_beside(output, ".profile-")?;
        let scratch = temp_dir_beside(output, ".convert-")?;
        let produced = convert_with_office(
            &self.program,
            Some(profile.path()),
            input,
            scratch.path(),
            self.timeout,
        )?;
        move_if_produced(&produced, output)
    }
}

/// Temporary directory next to `output`, removed when dropped
pub(crate) fn temp_dir_beside(output: &Path, prefix: &str) -> std::io::Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => builder.tempdir_in(parent),
        _ => builder.tempdir(),
    }
}

/// Move a converter's output into place. A missing file is left for the
/// caller to report.
pub(crate) fn move_if_produced(produced: &Path, output: &Path) -> Result<(), ConversionError> {
    if produced.exists() {
        std::fs::rename(produced, output)?;
    }
    Ok(())
}

/// Run `<program> --headless --convert-to pdf --outdir <outdir> <input>`.
///
/// `profile` selects a private user installation directory so the process
/// does not attach to an office instance the user already has open.
/// Returns the path the office suite writes to, `<outdir>/<stem>.pdf`.
pub(crate) fn convert_with_office(
    program: &Path,
    profile: Option<&Path>,
    input: &Path,
    outdir: &Path,
    timeout: Duration,
) -> Result<PathBuf, ConversionError> {
    let mut command = Command::new(program);
    if let Some(profile) = profile {
        command.arg(format!("-env:UserInstallation={}", file_url(profile)));
    }
    command
        .arg("--headless")
        .arg("--invisible")
        .arg("--norestore")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(outdir)
        .arg(input);

    debug!("Running {:?}", command);
    run_to_completion(command, program, timeout)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(outdir.join(format!("{}.pdf", stem)))
}

/// Child process that is killed if it is still running when dropped
struct ChildGuard {
    child: Child,
    finished: bool,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Spawn `command` and block until it exits or `timeout` passes.
///
/// Stderr is drained on a separate thread so a chatty converter cannot fill
/// the pipe and stall.
pub(crate) fn run_to_completion(
    mut command: Command,
    program: &Path,
    timeout: Duration,
) -> Result<(), ConversionError> {
    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ConversionError::ToolUnavailable {
            program: program.to_path_buf(),
            source,
        })?;
    let mut guard = ChildGuard { child, finished: false };

    let stderr_reader = guard.child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = guard.child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            return Err(ConversionError::Timeout {
                program: program.to_path_buf(),
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };
    guard.finished = true;

    if !status.success() {
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .map(|buf| String::from_utf8_lossy(&buf).trim().to_string())
            .unwrap_or_default();
        return Err(ConversionError::ToolFailed {
            program: program.to_path_buf(),
            status,
            stderr,
        });
    }

    Ok(())
}

/// `file://` URL for a local directory, as office suites expect for
/// `-env:UserInstallation`
fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
