//! # CLF Common Library
//!
//! Shared code for the custom-labels feedback tools:
//! - Error type and result alias
//! - Configuration file resolution and logging configuration
//! - Tracing subscriber bootstrap
//! - Object URI parsing (`s3://bucket/key`)
//! - Run id and timestamp helpers

pub mod config;
pub mod error;
pub mod logging;
pub mod time;
pub mod uri;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use uri::ObjectUri;
