//! Chat list presentation state.
//!
//! Holds the chats shown in the sidebar and which one is selected. Chat
//! creation is validated here before any network call is made.

use tracing::{error, info};

use crate::net::api::{ChatApi, DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET};
use crate::net::types::{ApiError, Chat, Presentation};
use crate::util::timestamp;

#[derive(Debug, thiserror::Error)]
pub enum ChatListError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// One rendered sidebar row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRow {
    pub id: String,
    pub title: String,
    pub date: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ChatListState {
    pub items: Vec<Chat>,
    pub current: Option<String>,
    /// The create form is open. Closed once a create reaches the API,
    /// whatever the outcome; validation failures leave it open.
    pub create_pending: bool,
}

impl ChatListState {
    /// Reload the chat list with the default page.
    ///
    /// # Errors
    ///
    /// Returns the transport error; the previous items are kept.
    pub async fn refresh(&mut self, api: &dyn ChatApi) -> Result<usize, ChatListError> {
        match api.list(DEFAULT_LIST_OFFSET, DEFAULT_LIST_LIMIT).await {
            Ok(items) => {
                self.items = items;
                Ok(self.items.len())
            }
            Err(e) => {
                error!(error = %e, "failed to fetch chats");
                Err(e.into())
            }
        }
    }

    /// Create a chat from a title and presentation, append it and select it.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without calling the API when the title is blank,
    /// no presentation was picked, or the file is not `.ppt`/`.pptx`.
    pub async fn create(
        &mut self,
        api: &dyn ChatApi,
        title: &str,
        presentation: Option<Presentation>,
    ) -> Result<Chat, ChatListError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatListError::Validation("chat title is required"));
        }
        let Some(presentation) = presentation else {
            return Err(ChatListError::Validation("a presentation file is required"));
        };
        if !presentation.has_accepted_extension() {
            return Err(ChatListError::Validation("only .ppt and .pptx presentations are accepted"));
        }

        let created = api.create(title, presentation).await;
        self.create_pending = false;
        let chat = created.inspect_err(|e| {
            error!(error = %e, "failed to create chat");
        })?;
        info!(chat_id = %chat.id, title = %chat.title, "chat created");
        self.items.push(chat.clone());
        self.current = Some(chat.id.clone());
        Ok(chat)
    }

    pub fn toggle_create(&mut self) -> bool {
        self.create_pending = !self.create_pending;
        self.create_pending
    }

    /// Record the selected chat. Returns true when the selection changed.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        let changed = self.current.as_deref() != id;
        self.current = id.map(str::to_owned);
        changed
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Chat> {
        self.items.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn rows(&self) -> Vec<ChatRow> {
        self.items
            .iter()
            .map(|chat| ChatRow {
                id: chat.id.clone(),
                title: chat.title.clone(),
                date: timestamp::display_date(&chat.created_at),
                selected: self.current.as_deref() == Some(chat.id.as_str()),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "chat_list_test.rs"]
mod chat_list_test;
