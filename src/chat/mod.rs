//! Interactive terminal front end for the agora chat service.
//!
//! This module provides the REPL built on top of the agora client library.
//! It supports:
//!
//! - Streaming replies that grow on screen as chunks arrive
//! - Structured replies with the results panel opened automatically
//! - Slash commands for managing sessions, images and results
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: client-side state and the service calls that change it
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, SessionRef, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ChatMode};
pub use session::{ApiStatus, ChatBackend, ChatSession};
