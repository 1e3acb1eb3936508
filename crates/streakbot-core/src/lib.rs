//! Core domain + response pipeline for the LINE streak bot.
//!
//! This crate is intentionally framework-agnostic. LINE and OpenAI live behind ports
//! (traits) implemented in adapter crates.

pub mod completion;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod logging;
pub mod messaging;
pub mod persona;
pub mod streak;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
