// ABOUTME: Host markup (HTML subset) to Slack mrkdwn conversion for outgoing messages
// ABOUTME: Maps inline tags to mrkdwn marks, links to <url|label>, and @name/#channel to references

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use slackline_core::MessageFlags;

use crate::account::SlackAccount;

static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());

static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[\s(])([@#])([A-Za-z0-9][A-Za-z0-9._-]*)").unwrap());

/// Convert host markup into Slack's message text.
///
/// `RAW` messages are passed through untouched.
pub fn html_to_message(account: &SlackAccount, html: &str, flags: MessageFlags) -> String {
    if flags.contains(MessageFlags::RAW) {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len());
    // (href, start of label in `out`)
    let mut open_link: Option<(String, usize)> = None;
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(account, &mut out, rest);
            break;
        };
        push_text(account, &mut out, &rest[..lt]);

        let Some(gt) = rest[lt..].find('>') else {
            // unterminated tag: treat the remainder as text
            push_text(account, &mut out, &rest[lt..]);
            break;
        };
        let tag = &rest[lt + 1..lt + gt];
        rest = &rest[lt + gt + 1..];

        let closing = tag.starts_with('/');
        let body = tag.trim_start_matches('/');
        let name: String = body
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match (name.as_str(), closing) {
            ("b" | "strong", _) => out.push('*'),
            ("i" | "em", _) => out.push('_'),
            ("s" | "strike" | "del", _) => out.push('~'),
            ("code" | "tt", _) => out.push('`'),
            ("pre", false) => out.push_str("```\n"),
            ("pre", true) => out.push_str("\n```"),
            ("br", _) => out.push('\n'),
            ("p" | "div", true) => out.push('\n'),
            ("a", false) => {
                open_link = link_target(body).map(|href| (href, out.len()));
            }
            ("a", true) => {
                if let Some((href, start)) = open_link.take() {
                    let label = out.split_off(start);
                    if label.is_empty() || label == escape(&href) {
                        out.push_str(&format!("<{}>", href));
                    } else {
                        out.push_str(&format!("<{}|{}>", href, label));
                    }
                }
            }
            _ => {}
        }
    }

    out
}

fn link_target(tag_body: &str) -> Option<String> {
    let caps = HREF.captures(tag_body)?;
    let href = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str();
    Some(decode_entities(href))
}

/// Append a text run: host entities decoded, Slack control characters
/// escaped, and known @user / #channel names turned into references.
fn push_text(account: &SlackAccount, out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    let escaped = escape(&decode_entities(text));
    let linked = MENTION.replace_all(&escaped, |caps: &Captures| {
        let lead = &caps[1];
        let sigil = &caps[2];
        let name = &caps[3];
        match reference_for(account, sigil, name) {
            Some(reference) => format!("{}{}", lead, reference),
            None => caps[0].to_string(),
        }
    });
    out.push_str(&linked);
}

fn reference_for(account: &SlackAccount, sigil: &str, name: &str) -> Option<String> {
    match sigil {
        "@" => match name {
            "here" | "channel" | "everyone" => Some(format!("<!{}>", name)),
            _ => account
                .directory
                .user_id_by_name(name)
                .map(|id| format!("<@{}>", id)),
        },
        "#" => account
            .directory
            .channel_id_by_name(name)
            .map(|id| format!("<#{}>", id)),
        _ => None,
    }
}

/// Slack requires these three characters escaped in message text
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
