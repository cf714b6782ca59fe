//! One-line cleanup of titles and prompts for the markdown dump

/// Result of [`clean_one_line`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanLine {
    pub text: String,
    /// Anything besides truncation differs from the input
    pub changed: bool,
    pub truncated: bool,
}

/// Reduce `input` to one readable line
///
/// Fenced code blocks are removed (an unclosed fence drops the rest), a
/// remaining pure JSON object is dropped entirely, whitespace runs collapse to
/// one space, and the result is cut to `max_chars` characters plus `…` when
/// `max_chars > 0`.
pub fn clean_one_line(input: &str, max_chars: usize) -> CleanLine {
    let mut text = input.to_string();
    let mut changed = false;

    while let Some(open) = text.find("```") {
        match text[open + 3..].find("```") {
            Some(close) => {
                text.replace_range(open..open + 3 + close + 3, "");
            }
            None => text.truncate(open),
        }
        changed = true;
    }

    if is_json_object(text.trim()) {
        text.clear();
        changed = true;
    }

    let mut text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut truncated = false;
    if max_chars > 0 {
        if let Some((cut, _)) = text.char_indices().nth(max_chars) {
            text.truncate(cut);
            text.push('…');
            truncated = true;
        }
    }

    if !truncated && text != input {
        changed = true;
    }

    CleanLine {
        text,
        changed,
        truncated,
    }
}

fn is_json_object(s: &str) -> bool {
    s.starts_with('{')
        && s.ends_with('}')
        && serde_json::from_str::<serde_json::Value>(s).is_ok()
}

/// Escape text for use inside HTML tags
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
