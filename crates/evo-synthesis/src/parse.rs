//! Response parsing: one fenced code block, then a `Reasoning:` line.

/// Used when the response carries no extractable reasoning line.
pub const REASONING_FALLBACK: &str = "(no reasoning provided)";

/// Extract the body of the first fenced code block, matching across
/// newlines. The opening fence's language tag is discarded. Returns `None`
/// when no complete fence pair exists.
pub fn extract_code_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the info string (e.g. "rust") up to the end of the fence line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].to_string())
}

/// Extract the trailing `Reasoning:` text after the code block, or the
/// fallback string when absent.
pub fn extract_reasoning(text: &str) -> String {
    let tail = match extract_code_block_span(text) {
        Some(end) => &text[end..],
        None => text,
    };
    match tail.find("Reasoning:") {
        Some(idx) => {
            let reason = tail[idx + "Reasoning:".len()..].trim();
            if reason.is_empty() {
                REASONING_FALLBACK.to_string()
            } else {
                reason.to_string()
            }
        }
        None => REASONING_FALLBACK.to_string(),
    }
}

/// Byte offset just past the first complete code fence, if any.
fn extract_code_block_span(text: &str) -> Option<usize> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(open + 3 + body_start + close + 3)
}
