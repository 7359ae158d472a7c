//! Structured extraction and repair: turns raw model text into a JSON value.
//!
//! Steps, each attempted only when the previous one failed:
//! 1. strip code fences
//! 2. strict parse
//! 3. tail-anchored recovery: find the complete fragment the text ends on,
//!    tried in a fixed order (string pair, number pair, literal pair, `]`, `}`)
//! 4. bracket balancing: close every still-open container, innermost first
//! 5. strict parse of the candidate
//!
//! Known blind spot: text cut inside a string literal or a number token is not
//! recovered. Scanning stays a small ordered matcher list on purpose; anything
//! smarter is an incremental JSON tokenizer, which is a different algorithm.

use once_cell::sync::Lazy;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("model output is not JSON and could not be repaired")]
    Unrecoverable,
}

/// How the value was obtained. Repaired values are partial documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    Parsed,
    Repaired,
}

// A JSON string literal, escapes included.
const STRING_LITERAL: &str = r#""(?:[^"\\]|\\.)*""#;

struct TailMatcher {
    name: &'static str,
    pattern: Regex,
}

fn tail_matcher(name: &'static str, pattern: &str) -> TailMatcher {
    TailMatcher {
        name,
        pattern: Regex::new(pattern).expect("tail matcher pattern is a valid regex"),
    }
}

/// Ordered by priority. Every pattern is anchored at the end of the text.
static TAIL_MATCHERS: Lazy<Vec<TailMatcher>> = Lazy::new(|| {
    vec![
        tail_matcher(
            "string pair",
            &format!(r"{STRING_LITERAL}\s*:\s*{STRING_LITERAL}$"),
        ),
        tail_matcher(
            "number pair",
            &format!(r"{STRING_LITERAL}\s*:\s*-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?$"),
        ),
        tail_matcher(
            "literal pair",
            &format!(r"{STRING_LITERAL}\s*:\s*(?:true|false|null)$"),
        ),
        tail_matcher("array close", r"\]$"),
        tail_matcher("object close", r"\}$"),
    ]
});

/// Removes a surrounding markdown code fence (optionally language-tagged).
/// Idempotent: stripping an already stripped text is a no-op.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop an info string such as `json` or `JSON` right after the fence.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Extracts a JSON value from raw model output.
#[cfg(test)]
pub fn extract(raw: &str) -> Result<Value, ExtractError> {
    extract_with_outcome(raw).map(|(value, _)| value)
}

/// Same as `extract`, also reporting whether repair was needed.
pub fn extract_with_outcome(raw: &str) -> Result<(Value, Extraction), ExtractError> {
    let text = strip_fences(raw);
    if text.is_empty() {
        return Err(ExtractError::Unrecoverable);
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok((value, Extraction::Parsed));
    }

    // Some models open with a sentence before the document.
    let text = skip_leading_prose(text);
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok((value, Extraction::Parsed));
    }

    let candidate = repair_truncated(text).ok_or(ExtractError::Unrecoverable)?;
    match serde_json::from_str::<Value>(&candidate) {
        Ok(value) => {
            info!(
                original_len = text.len(),
                repaired_len = candidate.len(),
                "Recovered truncated JSON from model output"
            );
            Ok((value, Extraction::Repaired))
        }
        Err(e) => {
            debug!("Repaired candidate still invalid: {e}");
            Err(ExtractError::Unrecoverable)
        }
    }
}

/// Drops text before the document. A fence opened in that prose is stripped
/// along with it, closing fence included.
fn skip_leading_prose(text: &str) -> &str {
    let Some(start) = text.find(['{', '[']) else {
        return text;
    };
    if let Some(fence) = text[..start].rfind("```") {
        let fenced = strip_fences(&text[fence..]);
        if fenced.starts_with(['{', '[']) {
            return fenced;
        }
    }
    &text[start..]
}

/// Builds a candidate document from a truncated one: cut at the tail boundary,
/// then close open containers. `None` when no boundary exists or the cut lands
/// inside a string literal.
pub fn repair_truncated(text: &str) -> Option<String> {
    let truncated = find_tail_boundary(text)?;
    let closers = closing_sequence(truncated)?;
    Some(format!("{truncated}{closers}"))
}

/// Returns the prefix of `text` that ends on the first matching tail pattern,
/// with trailing whitespace and commas discarded.
pub fn find_tail_boundary(text: &str) -> Option<&str> {
    let trimmed = text.trim_end_matches(|c: char| c.is_whitespace() || c == ',');
    if trimmed.is_empty() {
        return None;
    }

    TAIL_MATCHERS.iter().find_map(|matcher| {
        matcher.pattern.find(trimmed).map(|m| {
            debug!(pattern = matcher.name, at = m.end(), "Tail boundary found");
            &trimmed[..m.end()]
        })
    })
}

/// Closers needed to balance `text`, innermost first. String-aware, so
/// brackets inside literals are ignored. `None` if the text ends inside a
/// string or closes a container it never opened.
pub fn closing_sequence(text: &str) -> Option<String> {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    if in_string {
        return None;
    }
    Some(open.into_iter().rev().collect())
}
