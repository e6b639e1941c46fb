//! Comment bodies posted to the pull request.

use linenote_core::Suggestion;

/// Text of 1-indexed `line` in `content`, or `""` when out of range.
///
/// # Examples
///
/// ```
/// use linenote_review::format::original_line;
///
/// let content = "def f():\n    pass\n";
/// assert_eq!(original_line(content, 2), "    pass");
/// assert_eq!(original_line(content, 3), "");
/// ```
pub fn original_line(content: &str, line: u32) -> &str {
    if line == 0 {
        return "";
    }
    content.lines().nth(line as usize - 1).unwrap_or("")
}

/// Replacement text for the target line: the comment, then the original line.
///
/// # Examples
///
/// ```
/// use linenote_review::format::replacement;
///
/// let text = replacement("def f():\n    pass\n", 1, "# TODO: add docstring");
/// assert_eq!(text, "# TODO: add docstring\ndef f():");
/// ```
pub fn replacement(content: &str, line: u32, comment: &str) -> String {
    format!("{comment}\n{}", original_line(content, line))
}

/// A GitHub `suggestion` block that replaces `line` with the comment and the
/// original line.
///
/// # Examples
///
/// ```
/// use linenote_review::format::format_suggestion;
///
/// let body = format_suggestion("x = 1\n", 1, "# set x");
/// assert_eq!(body, "```suggestion\n# set x\nx = 1\n```");
/// ```
pub fn format_suggestion(content: &str, line: u32, comment: &str) -> String {
    let inner = replacement(content, line, comment);
    let fence = fence_for(&inner);
    format!("{fence}suggestion\n{inner}\n{fence}")
}

/// A fenced preview of the whole file with the suggestion applied.
///
/// Suggestions past the end of the file are appended.
pub fn format_preview(path: &str, content: &str, suggestion: &Suggestion) -> String {
    let mut lines: Vec<&str> = content.lines().collect();
    let at = (suggestion.line as usize).saturating_sub(1).min(lines.len());
    for (offset, comment_line) in suggestion.comment.lines().enumerate() {
        lines.insert(at + offset, comment_line);
    }
    let preview = lines.join("\n");
    let fence = fence_for(&preview);
    format!(
        "Suggested change for `{path}` at line {}:\n\n{fence}{}\n{preview}\n{fence}",
        suggestion.line,
        fence_language(path),
    )
}

/// Body of the issue comment posted when an inline comment is rejected.
///
/// `outside_diff` is set when GitHub refused the line as not part of the
/// diff; any other inline failure gets neutral wording.
///
/// # Examples
///
/// ```
/// use linenote_review::format::fallback_body;
///
/// let body = fallback_body("src/app.py", 12, "```suggestion\n# hi\nx\n```", true);
/// assert!(body.contains("src/app.py"));
/// assert!(body.contains("line 12"));
/// assert!(body.contains("outside the diff"));
/// ```
pub fn fallback_body(path: &str, line: u32, body: &str, outside_diff: bool) -> String {
    let reason = if outside_diff {
        "outside the diff"
    } else {
        "inline comment failed"
    };
    format!("**{path}**, line {line} ({reason}, posted here instead):\n\n{body}")
}

// A fence longer than any backtick run inside `text`.
fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

fn fence_language(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}
