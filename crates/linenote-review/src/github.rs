use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use linenote_core::{LinenoteError, PullRequest};
use serde::{Deserialize, Serialize};
use url::Url;

/// The pull request operations the comment pipeline depends on.
///
/// Implemented by [`GitHubClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// Decoded text of `path` at the pull request's head commit.
    async fn file_content(&self, pr: &PullRequest, path: &str) -> Result<String, LinenoteError>;

    /// Post an inline review comment on `line` of `path` at the head commit.
    ///
    /// GitHub answers 422 when the line is not part of the diff.
    async fn create_review_comment(
        &self,
        pr: &PullRequest,
        path: &str,
        line: u32,
        body: &str,
    ) -> Result<(), LinenoteError>;

    /// Post a comment on the pull request as a whole.
    async fn create_issue_comment(&self, pr: &PullRequest, body: &str) -> Result<(), LinenoteError>;

    /// Paths changed by the pull request, excluding removed files.
    async fn changed_files(&self, pr: &PullRequest) -> Result<Vec<String>, LinenoteError>;
}

/// GitHub REST client for reading pull request files and posting comments.
///
/// # Examples
///
/// ```
/// use linenote_review::github::parse_pr_reference;
///
/// let (owner, repo, number) = parse_pr_reference("rust-lang/rust#12345").unwrap();
/// assert_eq!(owner, "rust-lang");
/// assert_eq!(repo, "rust");
/// assert_eq!(number, 12345);
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
}

const PAGE_SIZE: u32 = 100;

#[derive(Serialize)]
struct Page {
    per_page: u32,
    page: u32,
}

#[derive(Serialize)]
struct AtRef<'a> {
    r#ref: &'a str,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct PullFile {
    filename: String,
    status: String,
}

#[derive(Deserialize)]
struct PullSummary {
    head: PullHead,
}

#[derive(Deserialize)]
struct PullHead {
    sha: String,
}

impl GitHubClient {
    /// Create a client from an explicit token or the `GITHUB_TOKEN` /
    /// `GH_TOKEN` environment variables.
    ///
    /// `GITHUB_API_URL`, set by GitHub Actions, selects the API host.
    ///
    /// # Errors
    ///
    /// Returns [`LinenoteError::Config`] if no token is available or the API
    /// URL is invalid, or [`LinenoteError::GitHub`] if the client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use linenote_review::github::GitHubClient;
    ///
    /// let client = GitHubClient::new(Some("ghp_xxxx")).unwrap();
    /// ```
    pub fn new(token: Option<&str>) -> Result<Self, LinenoteError> {
        let token = match token {
            Some(t) => t.to_string(),
            None => std::env::var("GITHUB_TOKEN")
                .or_else(|_| std::env::var("GH_TOKEN"))
                .map_err(|_| {
                    LinenoteError::Config(
                        "GITHUB_TOKEN not set. Set GITHUB_TOKEN or GH_TOKEN in the workflow env"
                            .into(),
                    )
                })?,
        };

        let mut builder = octocrab::Octocrab::builder().personal_token(token);
        if let Ok(api_url) = std::env::var("GITHUB_API_URL") {
            builder = builder.base_uri(api_url.as_str()).map_err(|e| {
                LinenoteError::Config(format!("invalid GITHUB_API_URL '{api_url}': {e}"))
            })?;
        }
        let octocrab = builder
            .build()
            .map_err(|e| LinenoteError::github(format!("failed to create GitHub client: {e}")))?;

        Ok(Self { octocrab })
    }

    /// Resolve the head commit of a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`LinenoteError::GitHub`] on API errors.
    pub async fn head_sha(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, LinenoteError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{number}");
        let pull: PullSummary = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| api_error("failed to fetch pull request", e))?;
        Ok(pull.head.sha)
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    async fn file_content(&self, pr: &PullRequest, path: &str) -> Result<String, LinenoteError> {
        let route = contents_route(pr, path)?;
        let response: ContentResponse = self
            .octocrab
            .get(route, Some(&AtRef { r#ref: &pr.head_sha }))
            .await
            .map_err(|e| api_error(&format!("failed to fetch {path}"), e))?;

        match (response.encoding.as_deref(), response.content) {
            (Some("base64"), Some(content)) => decode_content(&content),
            (encoding, _) => Err(LinenoteError::github(format!(
                "{path} has no inline content (encoding: {})",
                encoding.unwrap_or("none")
            ))),
        }
    }

    async fn create_review_comment(
        &self,
        pr: &PullRequest,
        path: &str,
        line: u32,
        body: &str,
    ) -> Result<(), LinenoteError> {
        let route = format!("/repos/{}/{}/pulls/{}/comments", pr.owner, pr.repo, pr.number);
        let payload = serde_json::json!({
            "body": body,
            "commit_id": pr.head_sha,
            "path": path,
            "line": line,
            "side": "RIGHT",
        });

        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(|e| api_error("failed to post review comment", e))?;
        Ok(())
    }

    async fn create_issue_comment(&self, pr: &PullRequest, body: &str) -> Result<(), LinenoteError> {
        let route = format!("/repos/{}/{}/issues/{}/comments", pr.owner, pr.repo, pr.number);
        let payload = serde_json::json!({ "body": body });

        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(|e| api_error("failed to post issue comment", e))?;
        Ok(())
    }

    async fn changed_files(&self, pr: &PullRequest) -> Result<Vec<String>, LinenoteError> {
        let route = format!("/repos/{}/{}/pulls/{}/files", pr.owner, pr.repo, pr.number);
        let mut files = Vec::new();
        let mut page = 1;
        loop {
            let batch: Vec<PullFile> = self
                .octocrab
                .get(
                    &route,
                    Some(&Page {
                        per_page: PAGE_SIZE,
                        page,
                    }),
                )
                .await
                .map_err(|e| api_error("failed to list pull request files", e))?;
            let last = batch.len() < PAGE_SIZE as usize;
            files.extend(
                batch
                    .into_iter()
                    .filter(|f| f.status != "removed")
                    .map(|f| f.filename),
            );
            if last {
                break;
            }
            page += 1;
        }
        Ok(files)
    }
}

// Each path segment is percent-encoded so spaces, `#` and `?` stay in the path.
fn contents_route(pr: &PullRequest, path: &str) -> Result<String, LinenoteError> {
    let mut url = Url::parse("https://api.github.com/")
        .map_err(|e| LinenoteError::Config(format!("invalid base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| LinenoteError::Config("base URL cannot carry a path".into()))?
        .pop_if_empty()
        .extend(["repos", pr.owner.as_str(), pr.repo.as_str(), "contents"])
        .extend(path.split('/').filter(|s| !s.is_empty()));
    Ok(url.path().to_string())
}

fn api_error(action: &str, err: octocrab::Error) -> LinenoteError {
    let status = match &err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    };
    LinenoteError::GitHub {
        status,
        message: format!("{action}: {err}"),
    }
}

/// Decode the base64 `content` field of the contents API.
///
/// GitHub wraps the encoded text at 60 columns, so whitespace is ignored.
///
/// # Errors
///
/// Returns [`LinenoteError::GitHub`] if the payload is not base64 or not UTF-8.
///
/// # Examples
///
/// ```
/// use linenote_review::github::decode_content;
///
/// assert_eq!(decode_content("ZGVmIGYoKToK\n").unwrap(), "def f():\n");
/// ```
pub fn decode_content(encoded: &str) -> Result<String, LinenoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| LinenoteError::github(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| LinenoteError::github("file content is not valid UTF-8"))
}

/// Parse a PR reference string (`owner/repo#number`) into its components.
///
/// # Errors
///
/// Returns [`LinenoteError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use linenote_review::github::parse_pr_reference;
///
/// let (owner, repo, num) = parse_pr_reference("octocat/hello-world#42").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// assert_eq!(num, 42);
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<(String, String, u64), LinenoteError> {
    let Some((owner_repo, number_str)) = pr_ref.split_once('#') else {
        return Err(LinenoteError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        )));
    };
    let Some((owner, repo)) = owner_repo.split_once('/') else {
        return Err(LinenoteError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        )));
    };
    if owner.is_empty() || repo.is_empty() {
        return Err(LinenoteError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        )));
    }
    let number: u64 = number_str
        .parse()
        .map_err(|_| LinenoteError::Config(format!("invalid PR number: {number_str}")))?;
    Ok((owner.to_string(), repo.to_string(), number))
}

/// Build an `owner/repo#number` reference from GitHub Actions variables.
///
/// `repository` is `GITHUB_REPOSITORY`; `git_ref` is `GITHUB_REF`, which is
/// `refs/pull/<number>/merge` on `pull_request` events.
///
/// # Examples
///
/// ```
/// use linenote_review::github::pr_reference_from_actions;
///
/// let pr = pr_reference_from_actions("octocat/hello", "refs/pull/42/merge");
/// assert_eq!(pr.as_deref(), Some("octocat/hello#42"));
/// assert!(pr_reference_from_actions("octocat/hello", "refs/heads/main").is_none());
/// ```
pub fn pr_reference_from_actions(repository: &str, git_ref: &str) -> Option<String> {
    if !repository.contains('/') {
        return None;
    }
    let number = git_ref.strip_prefix("refs/pull/")?.split('/').next()?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{repository}#{number}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_pr_reference() {
        let (owner, repo, num) = parse_pr_reference("rust-lang/rust#12345").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "rust");
        assert_eq!(num, 12345);
    }

    #[test]
    fn parse_pr_reference_missing_hash() {
        assert!(parse_pr_reference("owner/repo").is_err());
    }

    #[test]
    fn parse_pr_reference_missing_slash() {
        assert!(parse_pr_reference("repo#123").is_err());
    }

    #[test]
    fn parse_pr_reference_invalid_number() {
        assert!(parse_pr_reference("owner/repo#abc").is_err());
    }

    #[test]
    fn parse_pr_reference_empty_owner() {
        assert!(parse_pr_reference("/repo#1").is_err());
    }

    fn sample_pr() -> PullRequest {
        PullRequest {
            owner: "octocat".into(),
            repo: "hello".into(),
            number: 7,
            head_sha: "abc".into(),
        }
    }

    #[test]
    fn contents_route_encodes_each_segment() {
        let pr = sample_pr();
        assert_eq!(
            contents_route(&pr, "src/app.py").unwrap(),
            "/repos/octocat/hello/contents/src/app.py"
        );
        assert_eq!(
            contents_route(&pr, "docs/my notes.py").unwrap(),
            "/repos/octocat/hello/contents/docs/my%20notes.py"
        );
        assert_eq!(
            contents_route(&pr, "notes/#1?.md").unwrap(),
            "/repos/octocat/hello/contents/notes/%231%3F.md"
        );
    }

    #[test]
    fn contents_route_keeps_nested_directories() {
        let route = contents_route(&sample_pr(), "a/b c/d.py").unwrap();
        assert_eq!(route, "/repos/octocat/hello/contents/a/b%20c/d.py");
        assert!(!route.contains(' '));
    }

    #[test]
    fn actions_reference_requires_numeric_pull() {
        assert!(pr_reference_from_actions("", "refs/pull/7/merge").is_none());
        assert!(pr_reference_from_actions("o/r", "refs/pull//merge").is_none());
        assert!(pr_reference_from_actions("o/r", "refs/pull/abc/merge").is_none());
        let pr = pr_reference_from_actions("o/r", "refs/pull/7/head").unwrap();
        assert_eq!(parse_pr_reference(&pr).unwrap(), ("o".to_string(), "r".to_string(), 7));
    }

    #[test]
    fn decode_wrapped_content() {
        // "def f():\n    pass\n" split across lines the way the API returns it
        let encoded = "ZGVmIGYoKToKICAg\nIHBhc3MK\n";
        assert_eq!(decode_content(encoded).unwrap(), "def f():\n    pass\n");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_content("not base64!").is_err());
    }

    #[test]
    fn decode_rejects_binary_content() {
        // 0xff 0xfe
        assert!(decode_content("//4=").is_err());
    }
}
