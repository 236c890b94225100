//! Relaying progress written by external processes into chat messages.

pub mod pollable;
pub mod session;

pub use pollable::{PollableFile, UpdateSink};
pub use session::FilePollMessage;
