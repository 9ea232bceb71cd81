//! Shared relay state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the upload store and the public base URL used to build
//! retrieval links. Clone is required by Axum; all fields are cheap to clone.

use std::sync::Arc;

use crate::services::storage::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub store: UploadStore,
    pub public_url: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(store: UploadStore, public_url: String) -> Self {
        Self { store, public_url: public_url.trim_end_matches('/').into() }
    }

    /// Build the retrieval URL for a stored upload, carrying the original
    /// client filename as the `name` query parameter.
    #[must_use]
    pub fn retrieval_url(&self, generated: &str, original_name: &str) -> String {
        format!(
            "{}/uploads/{generated}?name={}",
            self.public_url,
            urlencoding::encode(original_name)
        )
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
