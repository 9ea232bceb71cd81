//! Message thread controller: the open chat's message list.
//!
//! DESIGN
//! ======
//! The server list is the source of truth. Sends append an optimistic
//! entry, call the server, then reload the whole thread; the reload
//! replaces the local list. Each optimistic entry moves through
//! `Pending -> Confirmed | RolledBack`.
//!
//! Methods take `&self`. State sits behind a `std::sync::Mutex` that is
//! never held across an `.await`, so concurrent triggers interleave the way
//! UI events do. A busy flag (open-in-progress or send-in-progress) drops
//! re-entrant sends instead of queuing them.
//!
//! Every load is tagged with a monotonic sequence number and a response is
//! applied only if no newer load was issued after it. Opens also carry a
//! cancellation token: opening another chat cancels the stale open before
//! the new request starts.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::net::api::ChatApi;
use crate::net::types::{ApiError, Chat, Message};
use crate::util::timestamp;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no message {0} in the open chat")]
    UnknownMessage(String),
}

/// Lifecycle of a displayed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Confirmed,
    RolledBack,
}

/// Client-side projection of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMessage {
    /// Server id, or `temp-<n>` / `upload-<n>` for optimistic entries.
    pub id: String,
    pub text: String,
    pub is_user: bool,
    pub timestamp: String,
    pub path: Option<String>,
    /// Local file name for attachment entries.
    pub file: Option<String>,
    pub delivery: Delivery,
}

impl LocalMessage {
    fn from_server(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            text: message.message.clone(),
            // The chat service only stores user-authored entries.
            is_user: true,
            timestamp: timestamp::display_time(&message.created_at),
            path: message.path.clone(),
            file: None,
            delivery: Delivery::Confirmed,
        }
    }

    fn pending(id: String, text: String) -> Self {
        Self {
            id,
            text,
            is_user: true,
            timestamp: timestamp::now_time(),
            path: None,
            file: None,
            delivery: Delivery::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// No chat selected; the list was emptied.
    Cleared,
    /// The server list was applied.
    Loaded { count: usize },
    /// A newer load was issued while this one was in flight.
    Superseded,
    /// Another open cancelled this one.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyText,
    NoChat,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was sent and no state changed.
    Skipped(SkipReason),
    /// The server accepted the message. `applied` is false when the
    /// reconciliation reload lost to a newer load.
    Confirmed { local_id: String, count: usize, applied: bool },
}

#[derive(Debug, Default)]
struct ThreadState {
    chat_id: Option<String>,
    messages: Vec<LocalMessage>,
    reference: Option<String>,
    draft: String,
    /// Sequence of the open currently holding the busy flag.
    loading_seq: Option<u64>,
    sending: bool,
    latest_seq: u64,
    open_token: Option<CancellationToken>,
    next_local: u64,
}

impl ThreadState {
    fn is_busy(&self) -> bool {
        self.sending || self.loading_seq.is_some()
    }

    fn next_seq(&mut self) -> u64 {
        self.latest_seq += 1;
        self.latest_seq
    }

    fn next_local_id(&mut self, prefix: &str) -> String {
        self.next_local += 1;
        format!("{prefix}-{}", self.next_local)
    }

    fn finish_open(&mut self, seq: u64) {
        if self.loading_seq == Some(seq) {
            self.loading_seq = None;
            self.open_token = None;
        }
    }

    fn replace_from_server(&mut self, chat: &Chat) {
        self.messages = chat.messages.iter().map(LocalMessage::from_server).collect();
    }

    /// Remove an optimistic entry, returning it marked rolled back.
    fn roll_back(&mut self, local_id: &str) -> Option<LocalMessage> {
        let index = self.messages.iter().position(|m| m.id == local_id)?;
        let mut removed = self.messages.remove(index);
        removed.delivery = Delivery::RolledBack;
        Some(removed)
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct ThreadController {
    api: Arc<dyn ChatApi>,
    state: Mutex<ThreadState>,
}

impl ThreadController {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api, state: Mutex::new(ThreadState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, ThreadState> {
        // A poisoned lock only means a panic elsewhere; the data is still usable.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn messages(&self) -> Vec<LocalMessage> {
        self.lock().messages.clone()
    }

    #[must_use]
    pub fn chat_id(&self) -> Option<String> {
        self.lock().chat_id.clone()
    }

    #[must_use]
    pub fn reference(&self) -> Option<String> {
        self.lock().reference.clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    #[must_use]
    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    pub fn set_draft(&self, text: &str) {
        text.clone_into(&mut self.lock().draft);
    }

    /// Attachment path of the newest message that carries one.
    #[must_use]
    pub fn latest_attachment(&self) -> Option<String> {
        self.lock().messages.iter().rev().find_map(|m| m.path.clone())
    }

    /// Open a chat and load its history, or clear the thread for `None`.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the history fetch fails. The
    /// previously displayed list is left as it was.
    pub async fn open_chat(&self, chat_id: Option<&str>) -> Result<OpenOutcome, ThreadError> {
        let (seq, token, chat_id) = {
            let mut st = self.lock();
            if let Some(stale) = st.open_token.take() {
                stale.cancel();
            }
            let seq = st.next_seq();

            let Some(chat_id) = chat_id else {
                st.chat_id = None;
                st.reference = None;
                st.messages.clear();
                st.loading_seq = None;
                debug!("thread cleared");
                return Ok(OpenOutcome::Cleared);
            };

            if st.chat_id.as_deref() != Some(chat_id) {
                st.reference = None;
            }
            st.chat_id = Some(chat_id.to_owned());
            st.loading_seq = Some(seq);
            let token = CancellationToken::new();
            st.open_token = Some(token.clone());
            (seq, token, chat_id)
        };

        let result = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(%seq, "open cancelled by a newer selection");
                return Ok(OpenOutcome::Cancelled);
            }
            result = self.api.get_by_id(chat_id) => result,
        };

        let mut st = self.lock();
        st.finish_open(seq);
        match result {
            Ok(chat) if seq == st.latest_seq => {
                st.replace_from_server(&chat);
                info!(chat_id = %chat.id, count = st.messages.len(), "thread loaded");
                Ok(OpenOutcome::Loaded { count: st.messages.len() })
            }
            Ok(_) => {
                debug!(%seq, latest = st.latest_seq, "discarding stale thread load");
                Ok(OpenOutcome::Superseded)
            }
            Err(e) => {
                error!(error = %e, "failed to load messages");
                Err(e.into())
            }
        }
    }

    /// Send the current draft.
    ///
    /// # Errors
    ///
    /// See [`ThreadController::send`].
    pub async fn send_draft(&self) -> Result<SendOutcome, ThreadError> {
        let draft = self.draft();
        self.send(&draft).await
    }

    /// Send `text` to the open chat, carrying the active reference.
    ///
    /// # Errors
    ///
    /// Returns the transport error if either the append or the
    /// reconciliation reload fails; the optimistic entry is removed first.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ThreadError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Skipped(SkipReason::EmptyText));
        }

        let (chat_id, reference, local_id) = {
            let mut st = self.lock();
            let Some(chat_id) = st.chat_id.clone() else {
                return Ok(SendOutcome::Skipped(SkipReason::NoChat));
            };
            if st.is_busy() {
                debug!("send dropped: thread busy");
                return Ok(SendOutcome::Skipped(SkipReason::Busy));
            }
            st.sending = true;
            let local_id = st.next_local_id("temp");
            st.messages.push(LocalMessage::pending(local_id.clone(), text.to_owned()));
            st.draft.clear();
            (chat_id, st.reference.clone(), local_id)
        };

        if let Err(e) = self.api.append_message(&chat_id, reference.as_deref(), text).await {
            return Err(self.fail_send(&local_id, e));
        }

        let seq = self.lock().next_seq();
        let reloaded = self.api.get_by_id(&chat_id).await;

        let chat = match reloaded {
            Ok(chat) => chat,
            Err(e) => return Err(self.fail_send(&local_id, e)),
        };

        let mut st = self.lock();
        st.sending = false;
        if st.reference == reference {
            st.reference = None;
        }

        let current = seq == st.latest_seq && st.chat_id.as_deref() == Some(chat_id.as_str());
        if current {
            st.replace_from_server(&chat);
        } else if let Some(entry) = st.messages.iter_mut().find(|m| m.id == local_id) {
            entry.delivery = Delivery::Confirmed;
        }
        info!(%chat_id, applied = current, "message sent");
        Ok(SendOutcome::Confirmed { local_id, count: chat.messages.len(), applied: current })
    }

    fn fail_send(&self, local_id: &str, err: ApiError) -> ThreadError {
        let mut st = self.lock();
        st.sending = false;
        if let Some(entry) = st.roll_back(local_id) {
            debug!(id = %entry.id, delivery = ?entry.delivery, "optimistic entry removed");
        }
        error!(error = %err, "failed to send message");
        err.into()
    }

    /// Mark a confirmed message as the context reference for the next send.
    /// Returns the message's attachment path, if any.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMessage` if no confirmed message has that id.
    pub fn select_reference(&self, message_id: &str) -> Result<Option<String>, ThreadError> {
        let mut st = self.lock();
        let path = st
            .messages
            .iter()
            .find(|m| m.id == message_id && m.delivery == Delivery::Confirmed)
            .map(|m| m.path.clone())
            .ok_or_else(|| ThreadError::UnknownMessage(message_id.to_owned()))?;
        st.reference = Some(message_id.to_owned());
        Ok(path)
    }

    pub fn clear_reference(&self) {
        self.lock().reference = None;
    }

    /// Append an optimistic "uploading" entry for a local file.
    /// Returns `None` (and changes nothing) when no chat is open or the
    /// thread is busy.
    #[must_use]
    pub fn begin_attachment(&self, file_name: &str) -> Option<String> {
        let mut st = self.lock();
        if st.chat_id.is_none() || st.is_busy() {
            return None;
        }
        st.sending = true;
        let id = st.next_local_id("upload");
        let mut entry = LocalMessage::pending(id.clone(), format!("Uploading file: {file_name}"));
        entry.file = Some(file_name.to_owned());
        st.messages.push(entry);
        Some(id)
    }

    /// Resolve an attachment entry started by [`ThreadController::begin_attachment`].
    pub fn finish_attachment(&self, local_id: &str, loaded: bool) {
        let mut st = self.lock();
        st.sending = false;
        if !loaded {
            if st.roll_back(local_id).is_some() {
                warn!(id = %local_id, "attachment rolled back");
            }
            return;
        }
        if let Some(entry) = st.messages.iter_mut().find(|m| m.id == local_id) {
            let name = entry.file.clone().unwrap_or_default();
            entry.text = format!("Uploaded file: {name}");
            entry.delivery = Delivery::Confirmed;
        }
    }
}

#[cfg(test)]
#[path = "thread_test.rs"]
mod thread_test;
