//! Longform draft sync.
//!
//! Keeps a writing project's scene tree, stored as nested arrays in an
//! index note's front matter, consistent with the scene notes that
//! actually exist in the vault.
//!
//! # Architecture
//!
//! - [`model`] - Data types (scenes, drafts, the `longform` metadata record)
//! - [`vault`] - Directory abstraction over disk and memory, file watching
//! - [`sync`] - Discovery, reconciliation and write-back of drafts
//! - [`config`] - Vault discovery and plugin settings
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod sync;
pub mod vault;

pub use error::{Error, Result};
