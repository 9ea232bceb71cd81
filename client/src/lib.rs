//! SlideChat client library.
//!
//! DESIGN
//! ======
//! `net` talks to the remote chat API and the upload relay; `state` holds
//! the controllers that keep chat selection, message history and the
//! embedded document viewer in sync. Front ends (the terminal CLI today)
//! drive everything through [`state::session::ChatSession`] and supply a
//! [`state::document::ViewerHost`] for the rendering engine they embed.

pub mod net;
pub mod state;
pub mod util;
