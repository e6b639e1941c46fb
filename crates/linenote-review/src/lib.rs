//! Comment orchestration for pull requests.
//!
//! Provides the suggestion sources (header policy, external analyzer),
//! comment formatting, the GitHub adapter, and the pipeline that posts
//! inline comments with an issue-comment fallback.

pub mod analyzer;
pub mod format;
pub mod github;
pub mod pipeline;
pub mod suggestion;
