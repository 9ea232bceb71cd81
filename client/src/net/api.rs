//! Remote chat API client.
//!
//! Thin request/response wrapper over `/api/v1/chat/`. Every call either
//! resolves with decoded data or rejects with the transport/HTTP error;
//! there are no retries and nothing is cached. Response decoding lives in
//! `parse_body` so it can be tested without a server.
//!
//! ERROR HANDLING
//! ==============
//! Failures are logged here at `error` and returned to the caller, which
//! decides whether to roll back optimistic state.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::error;

use super::types::{ApiError, Chat, PPTX_MIME, Presentation};

pub const DEFAULT_LIST_OFFSET: u32 = 0;
pub const DEFAULT_LIST_LIMIT: u32 = 100;

const CHAT_PATH: &str = "/api/v1/chat/";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// TRAIT
// =============================================================================

/// Operations the client performs against the remote chat service.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /api/v1/chat/?offset&limit`
    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<Chat>, ApiError>;

    /// `POST /api/v1/chat/` with multipart `title` + `presentation`.
    async fn create(&self, title: &str, presentation: Presentation) -> Result<Chat, ApiError>;

    /// `GET /api/v1/chat/{id}` including nested messages.
    async fn get_by_id(&self, id: &str) -> Result<Chat, ApiError>;

    /// `POST /api/v1/chat/{id}/add_message`. `reference_id` travels as
    /// `history_id`. The response shape is server-defined and returned raw.
    async fn append_message(
        &self,
        chat_id: &str,
        reference_id: Option<&str>,
        text: &str,
    ) -> Result<serde_json::Value, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpChatApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpChatApi {
    /// Build a client for the chat service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute<T: DeserializeOwned>(&self, what: &str, request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let result = async {
            let response = request
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            parse_body(status, &text)
        }
        .await;

        if let Err(e) = &result {
            error!(error = %e, call = what, "chat api call failed");
        }
        result
    }
}

#[async_trait::async_trait]
impl ChatApi for HttpChatApi {
    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<Chat>, ApiError> {
        let request = self.http.get(self.url(CHAT_PATH)).query(&list_query(offset, limit));
        self.execute("list", request).await
    }

    async fn create(&self, title: &str, presentation: Presentation) -> Result<Chat, ApiError> {
        let part = reqwest::multipart::Part::bytes(presentation.bytes)
            .file_name(presentation.name)
            .mime_str(PPTX_MIME)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("title", title.to_owned())
            .part("presentation", part);
        let request = self.http.post(self.url(CHAT_PATH)).multipart(form);
        self.execute("create", request).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Chat, ApiError> {
        let request = self.http.get(self.url(&chat_path(id)));
        self.execute("get_by_id", request).await
    }

    async fn append_message(
        &self,
        chat_id: &str,
        reference_id: Option<&str>,
        text: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let path = format!("{}/add_message", chat_path(chat_id));
        let request = self
            .http
            .post(self.url(&path))
            .query(&append_query(chat_id, reference_id, text));
        self.execute("append_message", request).await
    }
}

// =============================================================================
// REQUEST / RESPONSE HELPERS
// =============================================================================

fn chat_path(id: &str) -> String {
    format!("{CHAT_PATH}{id}")
}

fn list_query(offset: u32, limit: u32) -> [(&'static str, u32); 2] {
    [("offset", offset), ("limit", limit)]
}

/// Query pairs for `add_message`. An absent reference is omitted entirely.
fn append_query<'a>(chat_id: &'a str, reference_id: Option<&'a str>, text: &'a str) -> Vec<(&'static str, &'a str)> {
    let mut query = vec![("chat_id", chat_id)];
    if let Some(reference) = reference_id {
        query.push(("history_id", reference));
    }
    query.push(("message", text));
    query
}

pub(crate) fn parse_body<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        return Err(ApiError::Status { status, body: text.to_owned() });
    }
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::net::types::Message;

    /// In-memory chat service. Every call yields to the scheduler at least
    /// once so concurrent callers interleave the way network calls do.
    #[derive(Default)]
    pub struct MockChatApi {
        pub chats: Mutex<Vec<Chat>>,
        /// Extra scheduler yields before `get_by_id` answers for a chat.
        pub slow_gets: Mutex<HashMap<String, usize>>,
        pub fail_append: AtomicBool,
        pub fail_get: AtomicBool,
        pub fail_list: AtomicBool,
        pub fail_create: AtomicBool,
        pub list_calls: AtomicUsize,
        pub create_calls: AtomicUsize,
        pub get_calls: AtomicUsize,
        pub append_calls: AtomicUsize,
        /// `(chat_id, reference_id, text)` for every append.
        pub appended: Mutex<Vec<(String, Option<String>, String)>>,
    }

    impl MockChatApi {
        pub fn with_chats(chats: Vec<Chat>) -> Self {
            Self { chats: Mutex::new(chats), ..Self::default() }
        }

        pub fn set_slow(&self, chat_id: &str, yields: usize) {
            self.slow_gets.lock().unwrap().insert(chat_id.to_owned(), yields);
        }

        pub fn message_count(&self, chat_id: &str) -> usize {
            self.chats
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == chat_id)
                .map_or(0, |c| c.messages.len())
        }

        fn transport_error() -> ApiError {
            ApiError::Transport("connection refused".into())
        }
    }

    async fn pause(yields: usize) {
        for _ in 0..yields.max(1) {
            tokio::task::yield_now().await;
        }
    }

    pub fn chat(id: &str, title: &str, messages: Vec<Message>) -> Chat {
        Chat { id: id.into(), title: title.into(), created_at: "2025-04-20T10:00:00".into(), messages }
    }

    pub fn message(id: &str, text: &str, path: Option<&str>) -> Message {
        Message {
            id: id.into(),
            message: text.into(),
            created_at: "2025-04-20T10:30:15.123456".into(),
            path: path.map(str::to_owned),
        }
    }

    #[async_trait::async_trait]
    impl ChatApi for MockChatApi {
        async fn list(&self, offset: u32, limit: u32) -> Result<Vec<Chat>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            pause(1).await;
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(Self::transport_error());
            }
            let chats = self.chats.lock().unwrap();
            Ok(chats
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|c| Chat { messages: Vec::new(), ..c.clone() })
                .collect())
        }

        async fn create(&self, title: &str, presentation: Presentation) -> Result<Chat, ApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            pause(1).await;
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(Self::transport_error());
            }
            let mut chats = self.chats.lock().unwrap();
            let id = format!("chat-{}", chats.len() + 1);
            let first = message(
                &format!("{id}-m0"),
                &format!("uploaded {}", presentation.name),
                Some(&format!("http://relay.test/uploads/{id}?name={}", presentation.name)),
            );
            let created = chat(&id, title, vec![first]);
            chats.push(created.clone());
            Ok(created)
        }

        async fn get_by_id(&self, id: &str) -> Result<Chat, ApiError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            let yields = self.slow_gets.lock().unwrap().get(id).copied().unwrap_or(1);
            pause(yields).await;
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(Self::transport_error());
            }
            self.chats
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| ApiError::Status { status: 404, body: "chat not found".into() })
        }

        async fn append_message(
            &self,
            chat_id: &str,
            reference_id: Option<&str>,
            text: &str,
        ) -> Result<serde_json::Value, ApiError> {
            self.append_calls.fetch_add(1, Ordering::SeqCst);
            pause(1).await;
            if self.fail_append.load(Ordering::SeqCst) {
                return Err(Self::transport_error());
            }
            self.appended.lock().unwrap().push((
                chat_id.to_owned(),
                reference_id.map(str::to_owned),
                text.to_owned(),
            ));
            let mut chats = self.chats.lock().unwrap();
            let chat = chats
                .iter_mut()
                .find(|c| c.id == chat_id)
                .ok_or_else(|| ApiError::Status { status: 404, body: "chat not found".into() })?;
            let id = format!("{chat_id}-m{}", chat.messages.len() + 1);
            chat.messages.push(message(&id, text, None));
            Ok(serde_json::json!({ "id": id, "message": text }))
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
