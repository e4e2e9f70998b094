//! Line-based frontmatter editing.
//!
//! Frontmatter is the `---`-delimited key-value block at the head of a
//! content file. It is edited with a line rule, not a YAML parser: matching
//! `key: value` lines are rewritten in place, everything else is preserved
//! verbatim.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

const DELIMITER: &str = "---";

fn key_value_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_-]+)\s*:\s*(.*)$").expect("valid regex"))
}

/// Render a frontmatter value the way the block stores it: strings quoted,
/// everything else as raw JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Render a complete page: frontmatter block followed by the body.
pub fn render_page(frontmatter: &Map<String, Value>, body: &str) -> String {
    let mut out = String::from(DELIMITER);
    out.push('\n');
    for (key, value) in frontmatter {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&render_value(value));
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Apply `updates` to the file's leading frontmatter block.
///
/// Matching keys get their value replaced in place; line order and
/// non-matching lines are preserved; keys absent from the block are appended
/// before the closing delimiter. The body is never modified. Errors when the
/// file has no leading block.
pub fn apply_updates(content: &str, updates: &Map<String, Value>) -> Result<String, String> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
        .ok_or_else(|| "no frontmatter block found".to_string())?;

    let mut block_lines: Vec<&str> = Vec::new();
    let mut body_start = None;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == DELIMITER {
            body_start = Some(offset + line.len());
            break;
        }
        block_lines.push(trimmed);
        offset += line.len();
    }
    let body_start = body_start.ok_or_else(|| "unterminated frontmatter block".to_string())?;
    let body = &rest[body_start..];

    let mut seen: Vec<&str> = Vec::new();
    let mut rewritten: Vec<String> = Vec::new();
    for line in &block_lines {
        let replaced = key_value_line().captures(line).and_then(|caps| {
            let key = caps.get(1).expect("group 1").as_str();
            updates.get(key).map(|value| {
                seen.push(key);
                format!("{key}: {}", render_value(value))
            })
        });
        rewritten.push(replaced.unwrap_or_else(|| (*line).to_string()));
    }

    for (key, value) in updates {
        if !seen.iter().any(|k| k == key) {
            rewritten.push(format!("{key}: {}", render_value(value)));
        }
    }

    let mut out = String::from(DELIMITER);
    out.push('\n');
    for line in rewritten {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn updates(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn replaces_matching_keys_in_place() {
        let content = "---\ntitle: \"Old\"\ndraft: true\n---\n\nBody text.\n";
        let out = apply_updates(content, &updates(json!({"title": "New"}))).unwrap();
        assert_eq!(out, "---\ntitle: \"New\"\ndraft: true\n---\n\nBody text.\n");
    }

    #[test]
    fn non_string_values_written_raw() {
        let content = "---\ndraft: true\n---\nbody\n";
        let out = apply_updates(content, &updates(json!({"draft": false, "weight": 3}))).unwrap();
        assert_eq!(out, "---\ndraft: false\nweight: 3\n---\nbody\n");
    }

    #[test]
    fn missing_keys_are_appended_before_closing_delimiter() {
        let content = "---\ntitle: \"Post\"\n---\nbody\n";
        let out = apply_updates(content, &updates(json!({"tags": ["a", "b"]}))).unwrap();
        assert_eq!(
            out,
            "---\ntitle: \"Post\"\ntags: [\"a\",\"b\"]\n---\nbody\n"
        );
    }

    #[test]
    fn preserves_order_and_unmatched_lines() {
        let content = "---\n# generated\ntitle: \"A\"\nauthor: \"me\"\n---\nbody\n";
        let out = apply_updates(content, &updates(json!({"author": "you"}))).unwrap();
        assert_eq!(
            out,
            "---\n# generated\ntitle: \"A\"\nauthor: \"you\"\n---\nbody\n"
        );
    }

    #[test]
    fn body_is_never_modified() {
        let content = "---\ntitle: \"A\"\n---\n\ntitle: not frontmatter\n---\nmore\n";
        let out = apply_updates(content, &updates(json!({"title": "B"}))).unwrap();
        assert!(out.ends_with("\n\ntitle: not frontmatter\n---\nmore\n"));
    }

    #[test]
    fn errors_when_no_block_present() {
        assert!(apply_updates("just a body\n", &updates(json!({"a": 1}))).is_err());
        assert!(apply_updates("---\nunterminated\n", &updates(json!({"a": 1}))).is_err());
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let content = "---\ntitle: \"Old\"\n---\nbody\n";
        let set = updates(json!({"title": "New", "draft": false}));
        let once = apply_updates(content, &set).unwrap();
        let twice = apply_updates(&once, &set).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn renders_page_with_quoted_strings() {
        let fm = updates(json!({"title": "Hello", "draft": true}));
        let page = render_page(&fm, "# Hi\n");
        assert_eq!(page, "---\ndraft: true\ntitle: \"Hello\"\n---\n\n# Hi\n");
    }

    #[test]
    fn rendered_page_round_trips_through_apply() {
        let fm = updates(json!({"title": "Hello"}));
        let page = render_page(&fm, "body");
        let out = apply_updates(&page, &updates(json!({"title": "Hello"}))).unwrap();
        assert_eq!(page, out);
    }
}
