//! Core types, categories, configuration and error handling for wordcloud-tools.
//!
//! This crate provides the foundational abstractions shared by the storage layer,
//! the MCP server and the HTTP viewer.

pub mod category;
pub mod config;
pub mod error;
pub mod types;

pub use category::{auto_categorize, Category, CATEGORIES, DEFAULT_CATEGORY};
pub use config::Config;
pub use error::{Error, Result};
pub use types::{Connection, NewWord, Snapshot, Upsert, Word};
