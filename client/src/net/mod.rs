//! Networking: chat API client, relay client and wire types.

pub mod api;
pub mod relay;
pub mod types;
