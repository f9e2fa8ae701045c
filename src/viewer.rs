//! Opening saved documents in the platform's default PDF viewer.

use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Errors that can occur while launching a viewer.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Document does not exist: {0}")]
    MissingDocument(String),
}

/// Launchers that hand a file to the desktop's default application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Opener {
    XdgOpen,
    Open,
    Start,
}

impl Opener {
    /// Returns the command name for this launcher.
    pub fn command(&self) -> &str {
        match self {
            Opener::XdgOpen => "xdg-open",
            Opener::Open => "open",
            Opener::Start => "cmd",
        }
    }

    /// Arguments placed before the document path.
    fn leading_args(&self) -> &[&str] {
        match self {
            // The empty string is the window title `start` expects first.
            Opener::Start => &["/C", "start", ""],
            _ => &[],
        }
    }

    /// Picks the launcher for the current platform.
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Opener::Start
        } else if cfg!(target_os = "macos") {
            Opener::Open
        } else {
            Opener::XdgOpen
        }
    }

    /// Builds the command that opens `path`.
    pub fn build(&self, path: &Path) -> Command {
        let mut cmd = Command::new(self.command());
        cmd.args(self.leading_args()).arg(path);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    /// Opens `path` without waiting for the viewer to exit.
    pub fn open(&self, path: &Path) -> Result<Child, ViewerError> {
        if !path.exists() {
            return Err(ViewerError::MissingDocument(path.display().to_string()));
        }
        self.build(path).spawn().map_err(ViewerError::from)
    }
}
