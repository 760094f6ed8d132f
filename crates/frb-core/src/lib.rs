//! Core logic for the free-reboot bot.
//!
//! This crate is framework-agnostic. Telegram and the management HTTP API live
//! behind ports (traits) implemented in adapter crates.

pub mod allowlist;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod manage;
pub mod messaging;
pub mod reboot;

pub use errors::{Error, Result};
