//! Small shared helpers.

pub mod timestamp;
