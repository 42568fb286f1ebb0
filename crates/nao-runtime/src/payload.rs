//! Pull the structured payload out of annotated model text.
//!
//! Models like to wrap JSON in a fenced code block and surround it with
//! prose. [`extract_payload`] is the single place that knows about fences;
//! both parsers call it before looking at the text.

const FENCE: &str = "```";

/// Return the content of the first fenced block in `text`, or the whole text
/// when there is no fence. The result is trimmed.
///
/// A language tag right after the opening fence (`json`, `JSON`, ...) is
/// dropped, whether the payload starts on the next line or on the fence line
/// itself. An unterminated block runs to the end of the text.
///
/// ```rust
/// use nao_runtime::payload::extract_payload;
///
/// let reply = "Here you go:\n```json\n{\"actions\": []}\n```\nEnjoy!";
/// assert_eq!(extract_payload(reply), "{\"actions\": []}");
/// assert_eq!(extract_payload("  {\"tools\": []} "), "{\"tools\": []}");
/// ```
pub fn extract_payload(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text.trim();
    };
    let body = strip_tag(&text[open + FENCE.len()..]);

    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Drop a leading language tag when it ends at whitespace, at the end of the
/// text, or where a JSON document opens.
fn strip_tag(body: &str) -> &str {
    let tag_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(body.len());
    if tag_len == 0 {
        return body;
    }
    match body[tag_len..].chars().next() {
        None => "",
        Some(c) if c.is_whitespace() || c == '{' || c == '[' => &body[tag_len..],
        Some(_) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(extract_payload("\n {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn json_tagged_block_is_extracted() {
        let text = "Sure!\n```json\n{\"actions\": [{\"action\": \"wave\"}]}\n```\nDone.";
        assert_eq!(extract_payload(text), "{\"actions\": [{\"action\": \"wave\"}]}");
    }

    #[test]
    fn untagged_block_is_extracted() {
        let text = "```\n{\"tools\": []}\n```";
        assert_eq!(extract_payload(text), "{\"tools\": []}");
    }

    #[test]
    fn only_first_block_is_used() {
        let text = "```json\n{\"a\":1}\n```\nand\n```json\n{\"b\":2}\n```";
        assert_eq!(extract_payload(text), "{\"a\":1}");
    }

    #[test]
    fn inline_block_keeps_payload_on_fence_line() {
        assert_eq!(extract_payload("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn tag_on_the_payload_line_is_dropped() {
        assert_eq!(
            extract_payload("```json {\"actions\": [{\"action\": \"sit\"}]}```"),
            "{\"actions\": [{\"action\": \"sit\"}]}"
        );
        assert_eq!(extract_payload("```json[1, 2]```"), "[1, 2]");
        assert_eq!(extract_payload("```JSON  \n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        assert_eq!(extract_payload("```json\n{\"a\":1}\n"), "{\"a\":1}");
    }
}
