use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// Opening fences must start a line; a ``` mentioned mid-sentence is prose.
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^[ \t]*```[ \t]*([A-Za-z0-9_+-]*)[^\n]*\n(.*?)\n[ \t]*```").unwrap());
static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Body of the first fenced JSON block in a free-text model response. A
/// block counts when it is tagged `json` or is untagged and opens with `{`.
pub fn extract_json_block(response: &str) -> Result<&str, ParseError> {
    for caps in FENCE_RE.captures_iter(response) {
        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let Some(body) = caps.get(2) else {
            continue;
        };
        let body_text = body.as_str();
        let tagged_json = tag.eq_ignore_ascii_case("json") || tag.eq_ignore_ascii_case("json5");
        if tagged_json || (tag.is_empty() && body_text.trim_start().starts_with('{')) {
            return Ok(body_text);
        }
    }
    Err(ParseError::NoJsonBlock)
}

/// Drops trailing commas before closing brackets and collapses blank lines.
pub fn clean_json(raw: &str) -> String {
    let without_commas = TRAILING_COMMA_RE.replace_all(raw, "$1");
    BLANK_LINES_RE
        .replace_all(&without_commas, "\n")
        .trim()
        .to_string()
}

/// Cleans and parses a JSON document. Strict JSON first; JSON5 second so the
/// `// ...` comments models copy from the prompt example do not sink a reply.
pub fn parse_json(raw: &str) -> Result<Value, ParseError> {
    let cleaned = clean_json(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => Ok(value),
        Err(json_err) => json5::from_str::<Value>(&cleaned)
            .map_err(|_| ParseError::InvalidJson(json_err.to_string())),
    }
}

/// Locates, cleans and parses the graph document in a model response.
pub fn parse_response(response: &str) -> Result<Value, ParseError> {
    let block = extract_json_block(response)?;
    parse_json(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_json_block() {
        let response = "Here you go:\n```json\n{\"nodes\": []}\n```\nand\n```json\n{\"other\": 1}\n```\n";
        assert_eq!(extract_json_block(response).unwrap(), "{\"nodes\": []}");
    }

    #[test]
    fn skips_non_json_fences() {
        let response = "```python\nprint('x')\n```\n```\n{\"nodes\": []}\n```";
        assert_eq!(extract_json_block(response).unwrap(), "{\"nodes\": []}");
    }

    #[test]
    fn accepts_uppercase_tag_and_crlf() {
        let response = "```JSON\r\n{\"a\": 1}\r\n```";
        let value = parse_response(response).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn inline_backticks_do_not_open_a_fence() {
        let response = "Wrap code in ``` fences. Here it is:\n```json\n{\"nodes\": []}\n```\n";
        assert_eq!(extract_json_block(response).unwrap(), "{\"nodes\": []}");

        let bare = "Use ```json``` blocks, like so:\n```\n{\"edges\": []}\n```";
        assert_eq!(extract_json_block(bare).unwrap(), "{\"edges\": []}");
    }

    #[test]
    fn missing_block_is_an_error() {
        assert_eq!(extract_json_block("no code here"), Err(ParseError::NoJsonBlock));
        assert_eq!(
            extract_json_block("```text\nhello\n```"),
            Err(ParseError::NoJsonBlock)
        );
    }

    #[test]
    fn cleanup_strips_trailing_commas_and_blank_lines() {
        let cleaned = clean_json("{\n  \"a\": [1, 2,],\n\n\n  \"b\": {\"c\": 3,  }\n}\n");
        assert_eq!(cleaned, "{\n  \"a\": [1, 2],\n  \"b\": {\"c\": 3  }\n}");
        assert!(serde_json::from_str::<Value>(&cleaned).is_ok());
    }

    #[test]
    fn tolerates_comments_copied_from_the_prompt() {
        let response = r#"```json
{
  "nodes": [
    { "id": "1", "data": { "label": "Main" }, "position": { "x": 0, "y": 0 } }
    // ... more nodes
  ],
  "edges": []
}
```"#;
        let value = parse_response(response).unwrap();
        assert_eq!(value["nodes"][0]["id"], "1");
    }

    #[test]
    fn broken_json_is_reported() {
        let err = parse_response("```json\n{\"nodes\": [\n```").unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }
}
