//! Chat session: the chat list, the open thread and the document viewer
//! wired together.
//!
//! DESIGN
//! ======
//! The session is the only place that knows how the three parts relate.
//! Selecting a chat opens its thread and shows the newest attachment;
//! selecting a message as reference re-renders its attachment; sending
//! shows any attachment the reply brought in. Viewer failures never fail
//! the chat operation that triggered them. They come back as
//! [`DocumentStatus::Failed`] next to the chat result.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::net::api::ChatApi;
use crate::net::types::{Chat, Presentation, file_name_of, has_accepted_extension};
use crate::state::chat_list::{ChatListError, ChatListState};
use crate::state::document::{DocumentError, DocumentOrchestrator, DocumentSource, LoadedDocument};
use crate::state::thread::{OpenOutcome, SendOutcome, ThreadController, ThreadError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Thread(#[from] ThreadError),
    #[error(transparent)]
    ChatList(#[from] ChatListError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("{0}")]
    Validation(&'static str),
}

/// What happened to the viewer as a side effect of a chat operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Unchanged,
    Loaded(LoadedDocument),
    Failed(String),
}

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    chats: ChatListState,
    thread: ThreadController,
    document: DocumentOrchestrator,
}

impl ChatSession {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>, document: DocumentOrchestrator) -> Self {
        let thread = ThreadController::new(api.clone());
        Self { api, chats: ChatListState::default(), thread, document }
    }

    #[must_use]
    pub fn chats(&self) -> &ChatListState {
        &self.chats
    }

    pub fn chats_mut(&mut self) -> &mut ChatListState {
        &mut self.chats
    }

    #[must_use]
    pub fn thread(&self) -> &ThreadController {
        &self.thread
    }

    #[must_use]
    pub fn document(&self) -> &DocumentOrchestrator {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut DocumentOrchestrator {
        &mut self.document
    }

    // =========================================================================
    // CHAT LIST
    // =========================================================================

    /// # Errors
    ///
    /// Returns the transport error; the previous list is kept.
    pub async fn refresh_chats(&mut self) -> Result<usize, SessionError> {
        Ok(self.chats.refresh(self.api.as_ref()).await?)
    }

    /// Create a chat, select it and open its thread.
    ///
    /// The viewer shows the chat's newest attachment, falling back to the
    /// uploaded presentation itself when none can be fetched. Once the chat
    /// exists a failed history load is only logged.
    ///
    /// # Errors
    ///
    /// Returns validation or transport errors from creation.
    pub async fn create_chat(
        &mut self,
        title: &str,
        presentation: Option<Presentation>,
    ) -> Result<(Chat, DocumentStatus), SessionError> {
        let local = presentation.as_ref().map(|p| (p.name.clone(), p.bytes.clone()));
        let chat = self.chats.create(self.api.as_ref(), title, presentation).await?;

        let mut status = match self.thread.open_chat(Some(&chat.id)).await {
            Ok(_) => match self.thread.latest_attachment() {
                Some(url) => self.show_attachment(&url, false).await,
                None => DocumentStatus::Unchanged,
            },
            Err(e) => {
                warn!(chat_id = %chat.id, error = %e, "new chat created but its history did not load");
                DocumentStatus::Failed(e.to_string())
            }
        };
        if !matches!(status, DocumentStatus::Loaded(_)) {
            if let Some((name, bytes)) = local {
                status = self.show_bytes(&bytes, &name);
            }
        }
        Ok((chat, status))
    }

    /// Select a chat (or none), open its thread and show its newest
    /// attachment.
    ///
    /// # Errors
    ///
    /// Returns the thread's transport error; the selection is still
    /// recorded.
    pub async fn select_chat(
        &mut self,
        chat_id: Option<&str>,
    ) -> Result<(OpenOutcome, DocumentStatus), SessionError> {
        self.chats.select(chat_id);
        let outcome = self.thread.open_chat(chat_id).await?;
        let status = match (&outcome, self.thread.latest_attachment()) {
            (OpenOutcome::Loaded { .. }, Some(url)) => self.show_attachment(&url, false).await,
            _ => DocumentStatus::Unchanged,
        };
        Ok((outcome, status))
    }

    // =========================================================================
    // THREAD
    // =========================================================================

    /// Use a message as context for the next send and re-render its
    /// attachment.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMessage` when no confirmed message has that id.
    pub async fn select_reference(&mut self, message_id: &str) -> Result<DocumentStatus, SessionError> {
        match self.thread.select_reference(message_id)? {
            Some(url) => Ok(self.show_attachment(&url, true).await),
            None => Ok(DocumentStatus::Unchanged),
        }
    }

    /// Send `text` and show the new message's attachment when it carries
    /// one. A plain reply leaves the viewer on whatever it shows, including
    /// a referenced message's deck.
    ///
    /// # Errors
    ///
    /// Returns the send's transport error.
    pub async fn send(&mut self, text: &str) -> Result<(SendOutcome, DocumentStatus), SessionError> {
        let outcome = self.thread.send(text).await?;
        let newest = match &outcome {
            SendOutcome::Confirmed { applied: true, .. } => self.thread.messages().pop().and_then(|m| m.path),
            _ => None,
        };
        let status = match newest {
            Some(url) => self.show_attachment(&url, false).await,
            None => DocumentStatus::Unchanged,
        };
        Ok((outcome, status))
    }

    /// Show a local presentation and record it in the thread.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for non-presentation files or when no chat is
    /// open, and the viewer's error when the file cannot be shown. The
    /// optimistic thread entry is rolled back in that case.
    pub async fn attach_file(&mut self, path: &Path) -> Result<LoadedDocument, SessionError> {
        let name = file_name_of(path);
        if !has_accepted_extension(&name) {
            return Err(SessionError::Validation("only .ppt and .pptx presentations are accepted"));
        }
        let Some(local_id) = self.thread.begin_attachment(&name) else {
            return Err(SessionError::Validation("open a chat and wait for it to settle before attaching"));
        };

        let loaded = match self.ensure_viewer() {
            Ok(()) => self.document.load_from_file(path).await,
            Err(e) => Err(e),
        };
        self.thread.finish_attachment(&local_id, loaded.is_ok());
        Ok(loaded?)
    }

    // =========================================================================
    // VIEWER
    // =========================================================================

    fn ensure_viewer(&mut self) -> Result<(), DocumentError> {
        if self.document.is_mounted() { Ok(()) } else { self.document.mount() }
    }

    async fn show_attachment(&mut self, url: &str, force: bool) -> DocumentStatus {
        let showing = self.document.current().map(|d| &d.source);
        if !force && showing == Some(&DocumentSource::Url(url.to_owned())) {
            debug!(%url, "attachment already displayed");
            return DocumentStatus::Unchanged;
        }
        let loaded = match self.ensure_viewer() {
            Ok(()) => self.document.load_from_url(url).await,
            Err(e) => Err(e),
        };
        Self::status_of(loaded)
    }

    fn show_bytes(&mut self, bytes: &[u8], name: &str) -> DocumentStatus {
        let loaded = self.ensure_viewer().and_then(|()| self.document.load_bytes(bytes, name));
        Self::status_of(loaded)
    }

    fn status_of(loaded: Result<LoadedDocument, DocumentError>) -> DocumentStatus {
        match loaded {
            Ok(doc) => DocumentStatus::Loaded(doc),
            Err(e) => {
                warn!(error = %e, "document not shown");
                DocumentStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
