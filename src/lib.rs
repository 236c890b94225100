//! slugbot: chat-driven job queue for long-running media tools.

pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod messaging;
pub mod progress;
