//! # MV Sense Common Library
//!
//! Shared code for the MV Sense services including:
//! - Error types
//! - Bootstrap TOML configuration model
//! - Configuration file discovery

pub mod config;
pub mod error;

pub use error::{Error, Result};
