//! Foundation types for shellkit.
//!
//! Shared by every shellkit crate: the error enum returned by the matching
//! and dispatch engine, and the TOML configuration loaded by front-ends.

pub mod config;
pub mod error;
