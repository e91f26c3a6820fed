//! Engine reply to chat message translation.
//!
//! The dialogue engine answers with light HTML: `<br>` separates chat
//! bubbles, links arrive as anchors, and anything else is presentation the
//! chat platform cannot render. Translation is pure.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use mindbridge_core::types::{EngineReply, OutboundMessage};

/// Elements whose contents never reach the user.
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "textarea", "option"];

struct MarkupPatterns {
    line_break: Regex,
    comment: Regex,
    dropped: Vec<Regex>,
    anchor: Regex,
    href: Regex,
    tag: Regex,
    entity: Regex,
}

static PATTERNS: LazyLock<MarkupPatterns> = LazyLock::new(|| MarkupPatterns {
    line_break: Regex::new(r"(?i)<br\s*/?>").expect("Invalid line break regex"),
    comment: Regex::new(r"(?s)<!--.*?(?:-->|$)").expect("Invalid comment regex"),
    dropped: DROPPED_ELEMENTS
        .iter()
        .map(|name| {
            Regex::new(&format!(r"(?is)<{name}\b[^>]*>.*?(?:</{name}\s*>|$)"))
                .expect("Invalid element regex")
        })
        .collect(),
    anchor: Regex::new(r"(?is)<a\b([^>]*)>.*?(?:</a\s*>|$)").expect("Invalid anchor regex"),
    href: Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("Invalid href regex"),
    tag: Regex::new(r"</?[A-Za-z!][^>]*>").expect("Invalid tag regex"),
    entity: Regex::new(r"(?i)&(amp|lt|gt|quot|apos|nbsp|#39|#[0-9]+|#x[0-9a-f]+);")
        .expect("Invalid entity regex"),
});

/// Turn an engine reply into the chat messages to deliver, in order.
///
/// Quick responses attach to the last message. A reply with no visible text
/// yields no messages, and its quick responses are dropped with it.
pub fn translate(reply: &EngineReply) -> Vec<OutboundMessage> {
    let mut messages: Vec<OutboundMessage> = split_segments(&reply.response)
        .into_iter()
        .map(|segment| sanitize(&segment))
        .filter(|text| !text.is_empty())
        .map(OutboundMessage::text)
        .collect();

    if !reply.quick_responses.is_empty() {
        if let Some(last) = messages.last_mut() {
            last.quick_responses = Some(reply.quick_responses.clone());
        }
    }

    messages
}

/// Split a response on `<br>`, `<br/>` and `<br />`, case-insensitively.
pub fn split_segments(response: &str) -> Vec<String> {
    PATTERNS
        .line_break
        .split(response)
        .map(str::to_string)
        .collect()
}

/// Reduce one segment of markup to plain text.
///
/// Anchors become their `href`. Tags, comments and the contents of
/// non-visible elements are removed, common entities decoded, and the
/// result trimmed.
pub fn sanitize(segment: &str) -> String {
    let patterns = &*PATTERNS;

    let mut text = patterns.comment.replace_all(segment, "").into_owned();
    for element in &patterns.dropped {
        text = element.replace_all(&text, "").into_owned();
    }

    text = patterns
        .anchor
        .replace_all(&text, |caps: &Captures| {
            let attributes = caps.get(1).map_or("", |m| m.as_str());
            anchor_href(attributes).to_string()
        })
        .into_owned();

    text = patterns.tag.replace_all(&text, "").into_owned();
    decode_entities(&text).trim().to_string()
}

fn anchor_href(attributes: &str) -> &str {
    PATTERNS
        .href
        .captures(attributes)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map_or("", |m| m.as_str())
}

fn decode_entities(text: &str) -> String {
    PATTERNS
        .entity
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].to_ascii_lowercase();
            match name.as_str() {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" | "#39" => "'".to_string(),
                "nbsp" => " ".to_string(),
                numeric => numeric_entity(numeric).unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}

fn numeric_entity(name: &str) -> Option<String> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code).map(String::from)
}
