use linenote_core::{AnalyzerError, Suggestion};
use serde::Deserialize;

const DOCSTRING_QUOTES: &str = "\"\"\"";

/// Analyzer stdout: one suggestion object or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnalyzerOutput {
    Many(Vec<serde_json::Value>),
    Single(RawSuggestion),
}

#[derive(Deserialize)]
struct RawSuggestion {
    line: Option<serde_json::Value>,
    comment: Option<serde_json::Value>,
}

impl AnalyzerOutput {
    fn into_raw(self) -> Vec<RawSuggestion> {
        match self {
            AnalyzerOutput::Single(raw) => vec![raw],
            AnalyzerOutput::Many(values) => values
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
        }
    }
}

/// Parse analyzer output into validated [`Suggestion`] entries.
///
/// Accepts a single `{line, comment}` object or an array of them. Entries
/// without a positive integer `line` or a non-empty string `comment` are
/// dropped; the order of the rest is preserved. Comment text is passed
/// through [`normalize_comment`] with `marker`, so a valid entry keeps its
/// `line` and carries its comment as line comments: `"why?"` becomes
/// `"# why?"`, while `"# why?"` is kept as is.
///
/// # Errors
///
/// Returns [`AnalyzerError::Malformed`] if the output is not JSON, or is
/// JSON but neither an object nor an array.
///
/// # Examples
///
/// ```
/// use linenote_review::suggestion::parse_analyzer_output;
///
/// let out = br#"[{"line": 2, "comment": "why?"}, {"line": 3}]"#;
/// let suggestions = parse_analyzer_output(out, "#").unwrap();
/// assert_eq!(suggestions.len(), 1);
/// assert_eq!(suggestions[0].comment, "# why?");
/// ```
pub fn parse_analyzer_output(
    output: &[u8],
    marker: &str,
) -> Result<Vec<Suggestion>, AnalyzerError> {
    let parsed: AnalyzerOutput = serde_json::from_slice(output)?;

    let mut suggestions = Vec::new();
    for raw in parsed.into_raw() {
        let line = match &raw.line {
            Some(serde_json::Value::Number(n)) => {
                let Some(l) = n.as_u64() else { continue };
                if l == 0 {
                    continue;
                }
                let Ok(l) = u32::try_from(l) else { continue };
                l
            }
            _ => continue,
        };
        let comment = match &raw.comment {
            Some(serde_json::Value::String(s)) if !s.is_empty() => normalize_comment(s, marker),
            _ => continue,
        };
        if comment.is_empty() {
            continue;
        }
        suggestions.push(Suggestion { line, comment });
    }
    Ok(suggestions)
}

/// Turn free-form analyzer text into line comments.
///
/// Strips surrounding `"""` runs and whitespace, then prefixes every line with
/// `marker` unless it already starts with it. Blank lines become a bare
/// marker. Applying it twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use linenote_review::suggestion::normalize_comment;
///
/// let text = "\"\"\"Explain the loop.\n\nIt is O(n^2).\"\"\"";
/// assert_eq!(
///     normalize_comment(text, "#"),
///     "# Explain the loop.\n#\n# It is O(n^2)."
/// );
/// assert_eq!(normalize_comment("# already", "#"), "# already");
/// ```
pub fn normalize_comment(text: &str, marker: &str) -> String {
    let body = strip_docstring_quotes(text);

    if body.is_empty() {
        return String::new();
    }

    body.lines()
        .map(|line| {
            let line = line.trim();
            if line.is_empty() {
                marker.to_string()
            } else if line.starts_with(marker) {
                line.to_string()
            } else {
                format!("{marker} {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_docstring_quotes(text: &str) -> &str {
    let mut body = text.trim();
    loop {
        let stripped = body.strip_prefix(DOCSTRING_QUOTES).unwrap_or(body);
        let stripped = stripped
            .strip_suffix(DOCSTRING_QUOTES)
            .unwrap_or(stripped)
            .trim();
        if stripped.len() == body.len() {
            return body;
        }
        body = stripped;
    }
}
