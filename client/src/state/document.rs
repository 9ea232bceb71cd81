//! Document load orchestrator. Owns the single embedded viewer instance.
//!
//! DESIGN
//! ======
//! The rendering engine sits behind two traits: `ViewerHost` is the surface
//! the engine draws into (it can be cleared and can construct a viewer),
//! `Viewer` is one live engine instance. The orchestrator keeps at most one
//! instance in an owned slot. `mount` clears the host and replaces the slot
//! wholesale; `unmount` disposes the instance and clears the host. Release
//! also runs when construction fails and when the orchestrator is dropped,
//! so no exit path leaves an instance behind.
//!
//! Loading requires `&mut self`, which serializes loads into the slot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::net::relay::DocumentFetch;
use crate::net::types::{ApiError, file_name_of};

// =============================================================================
// VIEWER SEAM
// =============================================================================

/// Feature switches handed to the engine when an instance is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerFeatures {
    pub annotations: bool,
    pub text_selection: bool,
    pub file_picker: bool,
    pub print: bool,
    pub download: bool,
    pub office_editing: bool,
    pub toolbar_group: &'static str,
}

impl ViewerFeatures {
    /// Presentation-only configuration used for every mount.
    pub const READ_ONLY: Self = Self {
        annotations: false,
        text_selection: false,
        file_picker: false,
        print: false,
        download: false,
        office_editing: false,
        toolbar_group: "View",
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    #[error("viewer construction failed: {0}")]
    Construct(String),
    #[error("document rejected: {0}")]
    Load(String),
}

/// One live rendering-engine instance.
pub trait Viewer: Send {
    fn load_document(&mut self, bytes: &[u8], filename: &str) -> Result<(), ViewerError>;

    /// Tear the instance down. Called exactly once, on release.
    fn dispose(&mut self) {}
}

/// Surface the engine renders into.
pub trait ViewerHost: Send {
    /// Remove whatever the host currently displays.
    fn clear(&mut self);

    fn create_viewer(&mut self, features: &ViewerFeatures) -> Result<Box<dyn Viewer>, ViewerError>;
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("no viewer is mounted")]
    NotMounted,
    #[error("document fetch failed: {0}")]
    Fetch(#[from] ApiError),
    #[error("document read failed: {0}")]
    Io(String),
    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Url(String),
    Bytes,
}

/// What the viewer is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub name: String,
    pub size: usize,
    pub source: DocumentSource,
}

pub struct DocumentOrchestrator {
    host: Box<dyn ViewerHost>,
    slot: Option<Box<dyn Viewer>>,
    fetcher: Arc<dyn DocumentFetch>,
    current: Option<LoadedDocument>,
}

impl DocumentOrchestrator {
    #[must_use]
    pub fn new(host: Box<dyn ViewerHost>, fetcher: Arc<dyn DocumentFetch>) -> Self {
        Self { host, slot: None, fetcher, current: None }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.slot.is_some()
    }

    #[must_use]
    pub fn current(&self) -> Option<&LoadedDocument> {
        self.current.as_ref()
    }

    /// Build a fresh viewer instance, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns the engine's construction error; the slot is left empty and
    /// the host cleared.
    pub fn mount(&mut self) -> Result<(), DocumentError> {
        self.release();
        match self.host.create_viewer(&ViewerFeatures::READ_ONLY) {
            Ok(viewer) => {
                self.slot = Some(viewer);
                info!("viewer mounted");
                Ok(())
            }
            Err(e) => {
                self.host.clear();
                warn!(error = %e, "viewer construction failed");
                Err(e.into())
            }
        }
    }

    /// Dispose the instance and clear the host.
    pub fn unmount(&mut self) {
        self.release();
        debug!("viewer unmounted");
    }

    fn release(&mut self) {
        if let Some(mut viewer) = self.slot.take() {
            viewer.dispose();
        }
        self.host.clear();
        self.current = None;
    }

    /// Read a local file and show it, named after the file.
    ///
    /// # Errors
    ///
    /// Fails with `NotMounted` before touching the file when no viewer is
    /// live, with `Io` when the file cannot be read, or with the engine's
    /// load error.
    pub async fn load_from_file(&mut self, path: &Path) -> Result<LoadedDocument, DocumentError> {
        self.ensure_mounted()?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DocumentError::Io(format!("{}: {e}", path.display())))?;
        self.show(&bytes, file_name_of(path), DocumentSource::File(path.to_owned()))
    }

    /// Fetch a document by URL and show it, named after the URL's final
    /// path segment.
    ///
    /// # Errors
    ///
    /// Fails with `NotMounted`, the fetch error, or the engine's load error.
    pub async fn load_from_url(&mut self, url: &str) -> Result<LoadedDocument, DocumentError> {
        self.ensure_mounted()?;
        let bytes = self.fetcher.fetch(url).await?;
        self.show(&bytes, display_name_from_url(url), DocumentSource::Url(url.to_owned()))
    }

    /// Show an in-memory document.
    ///
    /// # Errors
    ///
    /// Fails with `NotMounted` or the engine's load error.
    pub fn load_bytes(&mut self, bytes: &[u8], name: &str) -> Result<LoadedDocument, DocumentError> {
        self.show(bytes, name.to_owned(), DocumentSource::Bytes)
    }

    fn ensure_mounted(&self) -> Result<(), DocumentError> {
        if self.slot.is_some() { Ok(()) } else { Err(DocumentError::NotMounted) }
    }

    fn show(&mut self, bytes: &[u8], name: String, source: DocumentSource) -> Result<LoadedDocument, DocumentError> {
        let viewer = self.slot.as_mut().ok_or(DocumentError::NotMounted)?;
        viewer.load_document(bytes, &name)?;
        let loaded = LoadedDocument { name, size: bytes.len(), source };
        info!(name = %loaded.name, size = loaded.size, "document loaded");
        self.current = Some(loaded.clone());
        Ok(loaded)
    }
}

impl Drop for DocumentOrchestrator {
    fn drop(&mut self) {
        self.release();
    }
}

/// Final path segment of `url`, ignoring query and fragment.
#[must_use]
pub fn display_name_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(segment) = parsed.path_segments().and_then(|mut s| s.next_back()) {
            if !segment.is_empty() {
                return segment.to_owned();
            }
        }
    }
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(without_query)
        .to_owned()
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;
