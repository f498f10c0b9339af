//! Reply formatting for Telegram.
//!
//! Adapter replies use `*bold*` and `` `code` `` spans. Those survive the
//! conversion to MarkdownV2; every other special character is escaped.

use teloxide::utils::markdown;

/// Replies with a link go out as plain text.
pub fn contains_url(text: &str) -> bool {
    text.contains("http://") || text.contains("https://")
}

/// Escapes `text` for MarkdownV2, keeping paired `*` and `` ` `` spans.
///
/// An unpaired marker is escaped like any other character.
pub fn to_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(pos) = rest.find(|c| c == '*' || c == '`') {
        let (plain, tail) = rest.split_at(pos);
        out.push_str(&markdown::escape(plain));

        let marker = if tail.starts_with('*') { '*' } else { '`' };
        let body = &tail[1..];
        match body.find(marker) {
            Some(end) if end > 0 => {
                let inner = &body[..end];
                out.push(marker);
                if marker == '*' {
                    out.push_str(&markdown::escape(inner));
                } else {
                    out.push_str(&markdown::escape_code(inner));
                }
                out.push(marker);
                rest = &body[end + 1..];
            }
            _ => {
                out.push('\\');
                out.push(marker);
                rest = body;
            }
        }
    }

    out.push_str(&markdown::escape(rest));
    out
}
