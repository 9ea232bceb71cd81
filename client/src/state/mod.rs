//! Client-side state controllers.
//!
//! DESIGN
//! ======
//! State is split by concern so each piece can be driven and tested alone:
//! `chat_list` (available chats and selection), `thread` (the open chat's
//! messages), `document` (the single viewer instance). `session` wires
//! them into the application's control flow.

pub mod chat_list;
pub mod document;
pub mod session;
pub mod thread;
