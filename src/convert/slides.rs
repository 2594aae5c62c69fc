//! Slide deck export through an automation session
//!
//! A session is acquired from a [`SlideDeckApp`] inside a working directory
//! owned by the caller, used to open one presentation without a window and
//! export it as PDF, then released.
//! [`AutomationSession`] owns the release: the presentation is closed and the
//! application quit when the guard goes out of scope, whether or not the
//! export succeeded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::convert::office::{convert_with_office, move_if_produced, temp_dir_beside};
use crate::convert::ConverterConfig;
use crate::error::ConversionError;

/// One running instance of a slide deck application
pub trait SlideDeckSession {
    /// Open a presentation without showing a window
    fn open_hidden(&mut self, presentation: &Path) -> Result<(), ConversionError>;
    /// Export the open presentation as PDF to `output`
    fn export_pdf(&mut self, output: &Path) -> Result<(), ConversionError>;
    /// Close the open presentation
    fn close_presentation(&mut self);
    /// Shut the application down
    fn quit(&mut self);
}

/// Starts slide deck automation sessions
pub trait SlideDeckApp {
    /// Start a session. Any private state it needs lives under `workdir`.
    fn launch(&self, workdir: &Path) -> Result<Box<dyn SlideDeckSession>, ConversionError>;
}

/// Guard over a launched session
pub struct AutomationSession {
    session: Box<dyn SlideDeckSession>,
    presentation_open: bool,
    running: bool,
}

impl AutomationSession {
    pub fn start(app: &dyn SlideDeckApp, workdir: &Path) -> Result<Self, ConversionError> {
        let session = app.launch(workdir)?;
        Ok(Self {
            session,
            presentation_open: false,
            running: true,
        })
    }

    pub fn open_hidden(&mut self, presentation: &Path) -> Result<(), ConversionError> {
        self.session.open_hidden(presentation)?;
        self.presentation_open = true;
        Ok(())
    }

    pub fn export_pdf(&mut self, output: &Path) -> Result<(), ConversionError> {
        if !self.presentation_open {
            return Err(ConversionError::Automation("no presentation is open".to_string()));
        }
        self.session.export_pdf(output)
    }

    /// Close the presentation and quit the application now
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.presentation_open {
            self.session.close_presentation();
            self.presentation_open = false;
        }
        if self.running {
            self.session.quit();
            self.running = false;
        }
    }
}

impl Drop for AutomationSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Export `presentation` as a PDF at `output` in a dedicated session
/// launched in `workdir`.
///
/// Returning `Ok` does not guarantee `output` exists; callers check.
pub fn export_presentation(
    app: &dyn SlideDeckApp,
    workdir: &Path,
    presentation: &Path,
    output: &Path,
) -> Result<(), ConversionError> {
    let mut session = AutomationSession::start(app, workdir)?;
    session.open_hidden(presentation)?;
    session.export_pdf(output)?;
    session.finish();
    Ok(())
}

/// `SlideDeckApp` backed by a headless office suite.
///
/// Launching creates a user profile directory private to the session, so
/// the office process never hands work to an instance the user has open.
/// Opening checks the deck; each export runs one headless office process
/// under the configured timeout, killed if it overruns. Quitting removes
/// the profile.
#[derive(Debug, Clone)]
pub struct OfficeSlideApp {
    program: PathBuf,
    timeout: Duration,
}

impl OfficeSlideApp {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            program: config.office_program.clone(),
            timeout: config.timeout,
        }
    }
}

impl SlideDeckApp for OfficeSlideApp {
    fn launch(&self, workdir: &Path) -> Result<Box<dyn SlideDeckSession>, ConversionError> {
        let profile = tempfile::Builder::new().prefix(".profile-").tempdir_in(workdir)?;
        debug!("Started slide deck session with profile {}", profile.path().display());
        Ok(Box::new(OfficeSlideSession {
            program: self.program.clone(),
            timeout: self.timeout,
            profile: Some(profile),
            presentation: None,
        }))
    }
}

struct OfficeSlideSession {
    program: PathBuf,
    timeout: Duration,
    profile: Option<TempDir>,
    presentation: Option<PathBuf>,
}

impl SlideDeckSession for OfficeSlideSession {
    fn open_hidden(&mut self, presentation: &Path) -> Result<(), ConversionError> {
        if !presentation.is_file() {
            return Err(ConversionError::NotFound(presentation.to_path_buf()));
        }
        self.presentation = Some(presentation.to_path_buf());
        Ok(())
    }

    fn export_pdf(&mut self, output: &Path) -> Result<(), ConversionError> {
        let presentation = self
            .presentation
            .as_deref()
            .ok_or_else(|| ConversionError::Automation("no presentation is open".to_string()))?;
        let profile = self
            .profile
            .as_ref()
            .ok_or_else(|| ConversionError::Automation("application has quit".to_string()))?;

        let scratch = temp_dir_beside(output, ".convert-")?;
        let produced = convert_with_office(
            &self.program,
            Some(profile.path()),
            presentation,
            scratch.path(),
            self.timeout,
        )?;
        move_if_produced(&produced, output)
    }

    fn close_presentation(&mut self) {
        self.presentation = None;
    }

    fn quit(&mut self) {
        if let Some(profile) = self.profile.take() {
            let path = profile.path().to_path_buf();
            if let Err(e) = profile.close() {
                warn!("Could not remove office profile {}: {}", path.display(), e);
            }
        }
    }
}
