use std::fmt;

use linenote_core::{
    CommentConfig, CommentStyle, FallbackPolicy, LinenoteError, PostKind, PullRequest, Suggestion,
};
use serde::Serialize;

use crate::analyzer::Analyzer;
use crate::format;
use crate::github::PullRequestApi;

/// Terminal state of one [`CommentPipeline::post_comment`] attempt.
#[derive(Debug)]
pub enum PostOutcome {
    /// The comment was posted, inline or as the issue-comment fallback.
    Posted(PostKind),
    /// The inline attempt failed with an error the fallback policy does not cover.
    Rejected(LinenoteError),
}

/// A comment that reached the pull request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedComment {
    /// File the suggestion targets.
    pub path: String,
    /// Target line.
    pub line: u32,
    /// Inline review comment or issue-comment fallback.
    pub kind: PostKind,
}

/// A changed file that produced no comments because of a failure or filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    /// File path as given.
    pub path: String,
    /// Why it was skipped.
    pub reason: String,
}

/// An inline comment that failed outside the fallback policy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedComment {
    /// File the suggestion targets.
    pub path: String,
    /// Target line.
    pub line: u32,
    /// The API error.
    pub reason: String,
}

/// Summary of a completed run.
///
/// # Examples
///
/// ```
/// use linenote_review::pipeline::RunReport;
///
/// let report = RunReport::default();
/// assert_eq!(report.inline_count(), 0);
/// assert!(report.to_markdown().contains("# linenote"));
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Files whose content was fetched and analyzed.
    pub files_processed: usize,
    /// Comments that reached the pull request, in posting order.
    pub posted: Vec<PostedComment>,
    /// Files skipped by filter, fetch failure, or analyzer failure.
    pub skipped: Vec<SkippedFile>,
    /// Inline comments rejected outside the fallback policy.
    pub rejected: Vec<RejectedComment>,
}

impl RunReport {
    /// Number of inline review comments posted.
    pub fn inline_count(&self) -> usize {
        self.count(PostKind::Inline)
    }

    /// Number of issue comments posted as fallback.
    pub fn fallback_count(&self) -> usize {
        self.count(PostKind::Fallback)
    }

    fn count(&self, kind: PostKind) -> usize {
        self.posted.iter().filter(|p| p.kind == kind).count()
    }

    fn skip(&mut self, path: &str, reason: String) {
        self.skipped.push(SkippedFile {
            path: path.to_string(),
            reason,
        });
    }
}

/// Drives the per-file loop: fetch, analyze, format, post.
///
/// Files are handled strictly in order, one suggestion at a time.
pub struct CommentPipeline<'a> {
    api: &'a dyn PullRequestApi,
    analyzer: &'a dyn Analyzer,
    style: CommentStyle,
    fallback: FallbackPolicy,
    skip_patterns: Vec<glob::Pattern>,
}

impl<'a> CommentPipeline<'a> {
    /// Create a pipeline posting through `api` with suggestions from `analyzer`.
    ///
    /// # Errors
    ///
    /// Returns [`LinenoteError::Config`] if a skip pattern is not a valid glob.
    pub fn new(
        api: &'a dyn PullRequestApi,
        analyzer: &'a dyn Analyzer,
        config: &CommentConfig,
    ) -> Result<Self, LinenoteError> {
        let mut skip_patterns = Vec::new();
        for pat in &config.skip_patterns {
            let p = glob::Pattern::new(pat).map_err(|e| {
                LinenoteError::Config(format!("invalid skip pattern '{pat}': {e}"))
            })?;
            skip_patterns.push(p);
        }

        Ok(Self {
            api,
            analyzer,
            style: config.style,
            fallback: config.fallback,
            skip_patterns,
        })
    }

    /// Run over every file the pull request changes.
    ///
    /// # Errors
    ///
    /// Returns [`LinenoteError::GitHub`] if the file list cannot be fetched,
    /// or anything [`CommentPipeline::run`] returns.
    pub async fn run_changed(&self, pr: &PullRequest) -> Result<RunReport, LinenoteError> {
        let files = self.api.changed_files(pr).await?;
        tracing::info!(%pr, files = files.len(), "listed changed files");
        self.run(pr, &files).await
    }

    /// Comment on `files` of `pr`.
    ///
    /// Fetch and analyzer failures skip the file and are recorded in the
    /// report. An inline rejection outside the fallback policy stops the
    /// remaining suggestions for that file only.
    ///
    /// # Errors
    ///
    /// Returns the API error if a fallback issue comment cannot be posted.
    pub async fn run(&self, pr: &PullRequest, files: &[String]) -> Result<RunReport, LinenoteError> {
        let mut report = RunReport::default();

        for path in files {
            let path = path.trim();
            if path.is_empty() {
                continue;
            }
            if let Some(pat) = self.skip_patterns.iter().find(|p| p.matches(path)) {
                tracing::debug!(path, pattern = %pat, "skipping file");
                report.skip(path, format!("matches skip pattern {pat}"));
                continue;
            }

            let content = match self.api.file_content(pr, path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path, error = %e, "could not fetch file, skipping");
                    report.skip(path, e.to_string());
                    continue;
                }
            };

            let suggestions = match self.analyzer.analyze(path, &content).await {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    tracing::warn!(path, error = %e, "analyzer failed, skipping");
                    report.skip(path, e.to_string());
                    continue;
                }
            };
            report.files_processed += 1;

            if suggestions.is_empty() {
                tracing::debug!(path, "no suggestions");
                continue;
            }

            for suggestion in &suggestions {
                let body = self.format_body(path, &content, suggestion);
                match self.post_comment(pr, path, suggestion.line, &body).await? {
                    PostOutcome::Posted(kind) => report.posted.push(PostedComment {
                        path: path.to_string(),
                        line: suggestion.line,
                        kind,
                    }),
                    PostOutcome::Rejected(e) => {
                        tracing::warn!(
                            path,
                            line = suggestion.line,
                            error = %e,
                            "inline comment rejected, skipping rest of file"
                        );
                        report.rejected.push(RejectedComment {
                            path: path.to_string(),
                            line: suggestion.line,
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Attempt an inline review comment, falling back to an issue comment.
    ///
    /// A 422 rejection always falls back; other failures fall back only
    /// under [`FallbackPolicy::Always`] and are otherwise returned as
    /// [`PostOutcome::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns the API error if the fallback issue comment fails.
    pub async fn post_comment(
        &self,
        pr: &PullRequest,
        path: &str,
        line: u32,
        body: &str,
    ) -> Result<PostOutcome, LinenoteError> {
        let inline_err = match self.api.create_review_comment(pr, path, line, body).await {
            Ok(()) => {
                tracing::info!(path, line, "posted review comment");
                return Ok(PostOutcome::Posted(PostKind::Inline));
            }
            Err(e) => e,
        };

        if !self.fallback.covers(&inline_err) {
            return Ok(PostOutcome::Rejected(inline_err));
        }

        tracing::info!(
            path,
            line,
            error = %inline_err,
            "inline comment not accepted, posting issue comment"
        );
        let fallback = format::fallback_body(path, line, body, inline_err.is_unprocessable());
        self.api.create_issue_comment(pr, &fallback).await?;
        Ok(PostOutcome::Posted(PostKind::Fallback))
    }

    fn format_body(&self, path: &str, content: &str, suggestion: &Suggestion) -> String {
        match self.style {
            CommentStyle::Suggestion => {
                format::format_suggestion(content, suggestion.line, &suggestion.comment)
            }
            CommentStyle::Preview => format::format_preview(path, content, suggestion),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "linenote run")?;
        writeln!(f, "============")?;
        writeln!(
            f,
            "Files: {} | Review comments: {} | Issue comments: {} | Rejected: {} | Skipped: {}\n",
            self.files_processed,
            self.inline_count(),
            self.fallback_count(),
            self.rejected.len(),
            self.skipped.len(),
        )?;

        for p in &self.posted {
            writeln!(f, "[{}] {}:{}", p.kind, p.path, p.line)?;
        }
        for r in &self.rejected {
            writeln!(f, "[rejected] {}:{} {}", r.path, r.line, r.reason)?;
        }
        for s in &self.skipped {
            writeln!(f, "[skipped] {} ({})", s.path, s.reason)?;
        }
        if self.posted.is_empty() && self.rejected.is_empty() && self.skipped.is_empty() {
            writeln!(f, "Nothing to comment on.")?;
        }
        Ok(())
    }
}

impl RunReport {
    /// Render the report as markdown, e.g. for `$GITHUB_STEP_SUMMARY`.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# linenote\n\n");
        out.push_str(&format!(
            "**Files:** {} | **Review comments:** {} | **Issue comments:** {} | **Rejected:** {} | **Skipped:** {}\n\n",
            self.files_processed,
            self.inline_count(),
            self.fallback_count(),
            self.rejected.len(),
            self.skipped.len(),
        ));

        if !self.posted.is_empty() {
            out.push_str("| File | Line | Posted as |\n|---|---|---|\n");
            for p in &self.posted {
                out.push_str(&format!("| `{}` | {} | {} |\n", p.path, p.line, p.kind));
            }
            out.push('\n');
        }
        for r in &self.rejected {
            out.push_str(&format!("- \u{274c} `{}:{}`: {}\n", r.path, r.line, r.reason));
        }
        for s in &self.skipped {
            out.push_str(&format!("- \u{23ed}\u{fe0f} `{}`: {}\n", s.path, s.reason));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        RunReport {
            files_processed: 2,
            posted: vec![
                PostedComment {
                    path: "a.py".into(),
                    line: 1,
                    kind: PostKind::Inline,
                },
                PostedComment {
                    path: "b.py".into(),
                    line: 7,
                    kind: PostKind::Fallback,
                },
            ],
            skipped: vec![SkippedFile {
                path: "c.py".into(),
                reason: "analyzer exited with status 1: boom".into(),
            }],
            rejected: vec![],
        }
    }

    #[test]
    fn counts_split_by_kind() {
        let report = sample_report();
        assert_eq!(report.inline_count(), 1);
        assert_eq!(report.fallback_count(), 1);
    }

    #[test]
    fn display_lists_each_outcome() {
        let text = sample_report().to_string();
        assert!(text.contains("[review comment] a.py:1"));
        assert!(text.contains("[issue comment] b.py:7"));
        assert!(text.contains("[skipped] c.py"));
    }

    #[test]
    fn empty_report_says_so() {
        assert!(RunReport::default().to_string().contains("Nothing to comment on."));
    }

    #[test]
    fn markdown_has_table() {
        let md = sample_report().to_markdown();
        assert!(md.contains("| `a.py` | 1 | review comment |"));
        assert!(md.contains("`c.py`"));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(json["filesProcessed"], 2);
        assert_eq!(json["posted"][1]["kind"], "fallback");
    }
}
