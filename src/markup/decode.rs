// ABOUTME: Slack mrkdwn and message JSON to host markup for display
// ABOUTME: Resolves <@user>/<#channel>/<url|label> references, inline marks, code blocks, and attachments

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use slackline_core::MessageFlags;

use crate::account::SlackAccount;
use crate::json::{array_field, object_field, string_field};
use crate::thread::thread_color;

static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^<>\s][^<>]*)>").unwrap());

static INLINE: Lazy<[(Regex, &'static str); 4]> = Lazy::new(|| {
    [
        (mark(r"\*"), "b"),
        (mark("_"), "i"),
        (mark("~"), "s"),
        (mark("`"), "code"),
    ]
});

const EDITED_COLOR: &str = "606060";

/// A mrkdwn span delimited by `delim` on both sides, starting at a word boundary
fn mark(delim: &str) -> Regex {
    Regex::new(&format!(
        r"(^|[\s(>]){d}([^{d}\s](?:[^{d}\n]*[^{d}\s])?){d}",
        d = delim
    ))
    .unwrap()
}

/// Append Slack message text to `html` as host markup.
///
/// When the text spans several lines and `prepend_newline` is given, it is
/// written first so the message starts on its own line.
pub fn message_to_html(
    html: &mut String,
    account: &SlackAccount,
    text: &str,
    flags: &mut MessageFlags,
    prepend_newline: Option<&str>,
) {
    if text.is_empty() {
        return;
    }
    if let Some(prefix) = prepend_newline {
        if text.contains('\n') {
            html.push_str(prefix);
        }
    }

    for segment in split_code_blocks(text) {
        match segment {
            Segment::Text(t) => push_formatted(html, account, t),
            Segment::CodeBlock(code) => {
                html.push_str("<pre>");
                html.push_str(&code.replace('\n', "<br>"));
                html.push_str("</pre>");
            }
        }
    }

    // Slack already escapes &, <, > as entities, which the host understands
    flags.remove(MessageFlags::RAW);
}

/// Append a whole Slack message object to `html`: thread marker, `/me`
/// prefix, text, edit marker, attachments, and files.
pub fn json_to_html(
    html: &mut String,
    account: &SlackAccount,
    json: &Value,
    flags: &mut MessageFlags,
) {
    let ts = string_field(json, "ts");
    if let Some(thread_ts) = string_field(json, "thread_ts") {
        if Some(thread_ts) != ts {
            html.push_str(&format!(
                "<font color=\"#{}\">[{}]</font> ",
                thread_color(thread_ts),
                thread_ts
            ));
        }
    }

    if string_field(json, "subtype") == Some("me_message") {
        html.push_str("/me ");
    }

    if let Some(text) = string_field(json, "text") {
        message_to_html(html, account, text, flags, Some("<br>"));
    }

    if object_field(json, "edited").is_some() {
        html.push_str(&format!(
            " <font color=\"#{}\">(edited)</font>",
            EDITED_COLOR
        ));
    }

    if let Some(attachments) = array_field(json, "attachments") {
        for attachment in attachments {
            push_attachment(html, account, attachment, flags);
        }
    }

    if let Some(files) = array_field(json, "files") {
        for file in files {
            push_file(html, file);
        }
    }
}

fn push_attachment(
    html: &mut String,
    account: &SlackAccount,
    attachment: &Value,
    flags: &mut MessageFlags,
) {
    let color = string_field(attachment, "color")
        .map(|c| c.trim_start_matches('#'))
        .filter(|c| c.len() == 6 && c.chars().all(|ch| ch.is_ascii_hexdigit()))
        .unwrap_or(EDITED_COLOR);
    let bar = format!("<br><font color=\"#{}\">|</font> ", color);

    if let Some(pretext) = string_field(attachment, "pretext") {
        html.push_str(&bar);
        message_to_html(html, account, pretext, flags, None);
    }
    if let Some(title) = string_field(attachment, "title") {
        html.push_str(&bar);
        html.push_str("<b>");
        match string_field(attachment, "title_link") {
            Some(link) => html.push_str(&format!("<a href=\"{}\">{}</a>", link, title)),
            None => html.push_str(title),
        }
        html.push_str("</b>");
    }
    match string_field(attachment, "text") {
        Some(text) => {
            html.push_str(&bar);
            message_to_html(html, account, text, flags, None);
        }
        None => {
            if let Some(fallback) = string_field(attachment, "fallback") {
                html.push_str(&bar);
                message_to_html(html, account, fallback, flags, None);
            }
        }
    }
}

fn push_file(html: &mut String, file: &Value) {
    let name = string_field(file, "title")
        .or_else(|| string_field(file, "name"))
        .unwrap_or("file");
    html.push_str("<br>");
    match string_field(file, "url_private").or_else(|| string_field(file, "permalink")) {
        Some(url) => html.push_str(&format!("<a href=\"{}\">{}</a>", url, name)),
        None => html.push_str(name),
    }
}

fn push_formatted(html: &mut String, account: &SlackAccount, text: &str) {
    let mut last = 0;
    for caps in REFERENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_inline(html, &text[last..whole.start()]);
        html.push_str(&render_reference(account, &caps[1]));
        last = whole.end();
    }
    push_inline(html, &text[last..]);
}

/// Apply inline marks and line breaks to a run without references
fn push_inline(html: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    let mut run = text.to_string();
    for (re, tag) in INLINE.iter() {
        run = re
            .replace_all(&run, |caps: &Captures| {
                format!("{}<{tag}>{}</{tag}>", &caps[1], &caps[2], tag = tag)
            })
            .into_owned();
    }
    html.push_str(&run.replace('\n', "<br>"));
}

/// Render the inside of a `<...>` reference
fn render_reference(account: &SlackAccount, inner: &str) -> String {
    let (target, label) = match inner.split_once('|') {
        Some((target, label)) => (target, Some(label)),
        None => (inner, None),
    };

    if let Some(user_id) = target.strip_prefix('@') {
        let name = label
            .map(str::to_string)
            .or_else(|| account.directory.user_name(user_id))
            .unwrap_or_else(|| user_id.to_string());
        return format!("@{}", name);
    }

    if let Some(channel_id) = target.strip_prefix('#') {
        let name = label
            .map(str::to_string)
            .or_else(|| account.directory.channel_name(channel_id))
            .unwrap_or_else(|| channel_id.to_string());
        return format!("#{}", name);
    }

    if let Some(special) = target.strip_prefix('!') {
        if let Some(label) = label {
            return label.to_string();
        }
        let keyword = special.split('^').next().unwrap_or(special);
        return format!("@{}", keyword);
    }

    let label = label.unwrap_or(target);
    format!("<a href=\"{}\">{}</a>", target, label)
}

// =============================================================================
// Content segmentation
// =============================================================================

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Text(&'a str),
    CodeBlock(&'a str),
}

/// Split text into plain runs and ``` fenced code blocks.
/// An unclosed fence runs to the end of the text.
fn split_code_blocks(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut remaining = content;

    while let Some(start) = remaining.find("```") {
        if start > 0 {
            segments.push(Segment::Text(&remaining[..start]));
        }
        let after_fence = &remaining[start + 3..];
        match after_fence.find("```") {
            Some(end) => {
                segments.push(Segment::CodeBlock(after_fence[..end].trim_matches('\n')));
                remaining = &after_fence[end + 3..];
            }
            None => {
                segments.push(Segment::CodeBlock(after_fence.trim_matches('\n')));
                remaining = "";
            }
        }
    }

    if !remaining.is_empty() {
        segments.push(Segment::Text(remaining));
    }

    segments
}

// =============================================================================
// Tests
// =============================================================================
