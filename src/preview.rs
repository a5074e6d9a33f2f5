//! HTML snippet preview
//!
//! Toggles an HTML snippet between its raw source and an isolated rendered
//! view. Rendering happens in the default browser on a file written to the
//! temp directory, a context that allows embedded scripting but has none of
//! this process's state, storage, or origin. No parsing or validation is
//! performed; malformed markup passes through as-is.

use crate::{ConfabError, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// Presentation mode for an HTML snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Source,
    Preview,
}

/// Two-mode view over one HTML snippet
#[derive(Debug, Clone)]
pub struct HtmlPreview {
    html: String,
    mode: ViewMode,
}

impl HtmlPreview {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            mode: ViewMode::Source,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Flip between source and preview; returns the new mode
    pub fn toggle(&mut self) -> ViewMode {
        self.mode = match self.mode {
            ViewMode::Source => ViewMode::Preview,
            ViewMode::Preview => ViewMode::Source,
        };
        debug!(mode = ?self.mode, "Preview mode toggled");
        self.mode
    }

    /// The raw markup, exactly as received
    pub fn source(&self) -> &str {
        &self.html
    }

    /// Render the snippet in an isolated context.
    ///
    /// Writes the markup verbatim to a uniquely named temp file and hands it
    /// to the default browser. Only meaningful in [`ViewMode::Preview`];
    /// calling in source mode is a no-op so a stale toggle cannot spawn a
    /// window.
    pub fn open(&self) -> Result<()> {
        if self.mode != ViewMode::Preview {
            return Ok(());
        }

        let path = self.write_temp()?;
        info!(path = %path.display(), "Opening HTML preview");
        webbrowser::open(&path.to_string_lossy())
            .map_err(|e| ConfabError::IOError(format!("failed to open preview: {e}")))
    }

    fn write_temp(&self) -> Result<PathBuf> {
        let path = std::env::temp_dir().join(format!("confab-preview-{}.html", Uuid::new_v4()));
        fs::write(&path, &self.html)?;
        Ok(path)
    }
}
