//! Core types, configuration, and error handling for linenote.
//!
//! This crate provides the shared foundation used by the other crates:
//! - [`LinenoteError`] and [`AnalyzerError`] — error types using `thiserror`
//! - [`LinenoteConfig`] — configuration loaded from `.linenote.toml`
//! - Shared types: [`PullRequest`], [`Suggestion`], [`PostKind`], [`Policy`],
//!   [`CommentStyle`], [`FallbackPolicy`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{AnalyzerConfig, CommentConfig, HeaderConfig, LinenoteConfig};
pub use error::{AnalyzerError, LinenoteError};
pub use types::{
    CommentStyle, FallbackPolicy, OutputFormat, Policy, PostKind, PullRequest, Suggestion,
};
