//! Core domain + application logic for the nyaa.si Telegram search bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and MongoDB live
//! behind ports (traits) implemented in adapter crates.

pub mod actions;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod nyaa;
pub mod pagination;
pub mod session;
pub mod stats;

pub use errors::{Error, Result};
