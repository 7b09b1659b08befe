//! Flattens a single [`ContentUnit`] into plain text.

use crate::contract::{BlockKind, ContentUnit};

/// Renders one content unit as a line of text.
///
/// Code blocks may span several lines. Returns an empty string when the unit
/// carries nothing to show; a divider always renders.
pub fn render_unit(unit: &ContentUnit) -> String {
    let text = unit.text();

    match &unit.kind {
        BlockKind::Heading1 => prefixed("# ", &text),
        BlockKind::Heading2 => prefixed("## ", &text),
        BlockKind::Heading3 => prefixed("### ", &text),
        BlockKind::BulletedListItem => prefixed("- ", &text),
        BlockKind::NumberedListItem => prefixed("1. ", &text),
        BlockKind::ToDo => {
            let mark = if unit.checked { "[x] " } else { "[ ] " };
            prefixed(mark, &text)
        }
        BlockKind::Quote => prefixed("> ", &text),
        BlockKind::Divider => "---".to_string(),
        BlockKind::Callout => match unit.icon.as_deref().filter(|i| !i.is_empty()) {
            Some(icon) => prefixed(&format!("> {icon} "), &text),
            None => prefixed("> ", &text),
        },
        BlockKind::Code => {
            if text.is_empty() {
                return String::new();
            }
            let lang = unit.language.as_deref().unwrap_or("");
            format!("```{lang}\n{text}\n```")
        }
        BlockKind::Media(kind) => {
            let caption = unit.caption.as_deref().unwrap_or("").trim();
            match unit.url.as_deref() {
                Some(url) if caption.is_empty() => format!("[{}] {url}", kind.label()),
                Some(url) => format!("[{}] {caption} ({url})", kind.label()),
                None if caption.is_empty() => String::new(),
                None => format!("[{}] {caption}", kind.label()),
            }
        }
        BlockKind::Bookmark => {
            let caption = unit.caption.as_deref().unwrap_or("").trim();
            match unit.url.as_deref() {
                Some(url) if caption.is_empty() => format!("[{url}]({url})"),
                Some(url) => format!("[{caption}]({url})"),
                None => caption.to_string(),
            }
        }
        BlockKind::LinkPreview => unit.url.clone().unwrap_or_default(),
        BlockKind::Unsupported | BlockKind::Paragraph | BlockKind::Other(_) => text,
    }
}

fn prefixed(prefix: &str, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("{prefix}{text}")
    }
}
