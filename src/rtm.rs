// ABOUTME: RTM event handling for message and typing events, plus outgoing typing notices
// ABOUTME: Incoming messages are rendered to host markup and delivered to their conversation

use serde_json::Value;
use slackline_core::{ChatUser, MessageFlags, RenderedMessage, TypingState};

use crate::account::SlackAccount;
use crate::json::{object_field, string_field};
use crate::markup::json_to_html;
use crate::thread::timestamp::ts_seconds;

/// Seconds before the host should repeat a typing notification
pub const TYPING_RESEND_SECS: u32 = 3;

/// Route one RTM event by its `type`
pub fn handle_event(account: &SlackAccount, json: &Value) {
    match string_field(json, "type") {
        Some("message") => handle_message(account, json),
        Some("user_typing") => handle_user_typing(account, json),
        Some(other) => {
            tracing::trace!(event_type = %other, "Ignoring RTM event");
        }
        None => {
            tracing::debug!("RTM event without type");
        }
    }
}

/// Handle an RTM `message` event
pub fn handle_message(account: &SlackAccount, json: &Value) {
    let Some(channel_id) = string_field(json, "channel") else {
        tracing::debug!("Message event without channel");
        return;
    };
    let Some(conversation) = account.directory.conversation(channel_id) else {
        tracing::debug!(channel = %channel_id, "Message for unknown conversation");
        return;
    };

    let message = match string_field(json, "subtype") {
        Some("message_changed") => match object_field(json, "message") {
            Some(inner) => inner,
            None => {
                tracing::debug!(channel = %channel_id, "message_changed without message");
                return;
            }
        },
        Some("message_deleted") | Some("message_replied") => {
            tracing::trace!(channel = %channel_id, "Ignoring message update");
            return;
        }
        _ => json,
    };

    match render_message(account, message, MessageFlags::NONE) {
        Some(rendered) => account.host.deliver_message(&conversation, &rendered),
        None => {
            tracing::debug!(channel = %channel_id, "Nothing to display for message");
        }
    }
}

/// Handle an RTM `user_typing` event
pub fn handle_user_typing(account: &SlackAccount, json: &Value) {
    let (Some(channel_id), Some(user_id)) =
        (string_field(json, "channel"), string_field(json, "user"))
    else {
        tracing::debug!("user_typing event missing channel or user");
        return;
    };
    if user_id == account.directory.self_user_id() {
        return;
    }
    let Some(conversation) = account.directory.conversation(channel_id) else {
        return;
    };

    let user = chat_user(account, user_id);
    account
        .host
        .user_typing(&conversation, &user, TypingState::Typing);
}

/// Tell the peer named `who` that we are typing.
///
/// Returns the seconds until the host should send again, or 0 when nothing
/// was sent.
pub async fn send_typing(account: &SlackAccount, who: &str, state: TypingState) -> u32 {
    if state != TypingState::Typing {
        return 0;
    }
    let Some(typing) = account.transport.typing() else {
        return 0;
    };
    let conversation = account
        .directory
        .user_id_by_name(who)
        .and_then(|id| account.directory.direct_conversation(&id));
    let Some(conversation) = conversation else {
        tracing::debug!(who = %who, "No direct conversation for typing notice");
        return 0;
    };

    match typing.send_typing(conversation.id()).await {
        Ok(()) => TYPING_RESEND_SECS,
        Err(e) => {
            tracing::warn!(channel = %conversation.id(), error = %e, "Failed to send typing notice");
            0
        }
    }
}

/// Render one Slack message object for display.
///
/// Messages from the account's own user get `SEND`, others `RECV`, in
/// addition to `base`. `None` when the message has no `ts` or renders empty.
pub fn render_message(
    account: &SlackAccount,
    message: &Value,
    base: MessageFlags,
) -> Option<RenderedMessage> {
    let ts = string_field(message, "ts")?.to_string();
    let sender = sender_of(account, message);

    let mut flags = base;
    if sender.id == account.directory.self_user_id() {
        flags |= MessageFlags::SEND;
    } else {
        flags |= MessageFlags::RECV;
    }

    let mut html = String::new();
    json_to_html(&mut html, account, message, &mut flags);
    if html.is_empty() {
        return None;
    }

    Some(RenderedMessage {
        sender,
        html,
        flags,
        timestamp: ts_seconds(&ts),
        thread_ts: string_field(message, "thread_ts").map(str::to_string),
        ts,
    })
}

fn sender_of(account: &SlackAccount, message: &Value) -> ChatUser {
    if let Some(user_id) = string_field(message, "user") {
        return chat_user(account, user_id);
    }
    let bot_id = string_field(message, "bot_id").unwrap_or_default();
    match string_field(message, "username") {
        Some(name) => ChatUser::with_name(bot_id, name),
        None => ChatUser::new(bot_id),
    }
}

fn chat_user(account: &SlackAccount, user_id: &str) -> ChatUser {
    match account.directory.user_name(user_id) {
        Some(name) => ChatUser::with_name(user_id, name),
        None => ChatUser::new(user_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTransport, TestBed};
    use serde_json::json;

    #[test]
    fn test_incoming_message_delivered() {
        let bed = TestBed::new();
        handle_event(
            &bed.account,
            &json!({
                "type": "message",
                "channel": "C100",
                "user": "U200",
                "text": "hello *team*",
                "ts": "1700000000.000100"
            }),
        );

        let delivered = bed.host.delivered();
        assert_eq!(delivered.len(), 1);
        let (conv_id, msg) = &delivered[0];
        assert_eq!(conv_id, "C100");
        assert_eq!(msg.sender, ChatUser::with_name("U200", "alice"));
        assert_eq!(msg.html, "hello <b>team</b>");
        assert!(msg.flags.contains(MessageFlags::RECV));
        assert_eq!(msg.timestamp, 1700000000);
        assert_eq!(msg.ts, "1700000000.000100");
    }

    #[test]
    fn test_own_message_flagged_send() {
        let bed = TestBed::new();
        handle_message(
            &bed.account,
            &json!({"channel": "C100", "user": "U001", "text": "mine", "ts": "1.000001"}),
        );
        let delivered = bed.host.delivered();
        assert!(delivered[0].1.flags.contains(MessageFlags::SEND));
        assert!(!delivered[0].1.flags.contains(MessageFlags::RECV));
    }

    #[test]
    fn test_unknown_channel_ignored() {
        let bed = TestBed::new();
        handle_message(
            &bed.account,
            &json!({"channel": "C999", "user": "U200", "text": "x", "ts": "1.0"}),
        );
        assert!(bed.host.delivered().is_empty());
    }

    #[test]
    fn test_message_changed_uses_inner_message() {
        let bed = TestBed::new();
        handle_message(
            &bed.account,
            &json!({
                "type": "message",
                "subtype": "message_changed",
                "channel": "C100",
                "hidden": true,
                "message": {
                    "user": "U200",
                    "text": "fixed typo",
                    "ts": "1.000001",
                    "edited": {"user": "U200", "ts": "1.000009"}
                }
            }),
        );
        let delivered = bed.host.delivered();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].1.html.starts_with("fixed typo"));
        assert!(delivered[0].1.html.contains("(edited)"));
    }

    #[test]
    fn test_message_deleted_ignored() {
        let bed = TestBed::new();
        handle_message(
            &bed.account,
            &json!({"subtype": "message_deleted", "channel": "C100", "deleted_ts": "1.0"}),
        );
        assert!(bed.host.delivered().is_empty());
    }

    #[test]
    fn test_bot_message_sender() {
        let bed = TestBed::new();
        handle_message(
            &bed.account,
            &json!({
                "subtype": "bot_message",
                "channel": "C100",
                "bot_id": "B1",
                "username": "deploybot",
                "text": "deployed",
                "ts": "1.000001"
            }),
        );
        let delivered = bed.host.delivered();
        assert_eq!(delivered[0].1.sender.label(), "deploybot");
    }

    #[test]
    fn test_thread_reply_carries_thread_ts() {
        let bed = TestBed::new();
        handle_message(
            &bed.account,
            &json!({
                "channel": "D200",
                "user": "U200",
                "text": "reply",
                "ts": "2.000002",
                "thread_ts": "1.000001"
            }),
        );
        let delivered = bed.host.delivered();
        assert_eq!(delivered[0].0, "D200");
        assert_eq!(delivered[0].1.thread_ts.as_deref(), Some("1.000001"));
    }

    #[test]
    fn test_user_typing_forwarded() {
        let bed = TestBed::new();
        handle_event(
            &bed.account,
            &json!({"type": "user_typing", "channel": "D200", "user": "U200"}),
        );
        assert_eq!(
            bed.host.typing(),
            vec![("D200".to_string(), "U200".to_string(), TypingState::Typing)]
        );
    }

    #[test]
    fn test_own_typing_ignored() {
        let bed = TestBed::new();
        handle_user_typing(&bed.account, &json!({"channel": "D200", "user": "U001"}));
        assert!(bed.host.typing().is_empty());
    }

    #[tokio::test]
    async fn test_send_typing_with_capability() {
        let bed = TestBed::with_transport(RecordingTransport::with_typing());
        let resend = send_typing(&bed.account, "alice", TypingState::Typing).await;
        assert_eq!(resend, TYPING_RESEND_SECS);
        assert_eq!(bed.transport.typing_channels(), vec!["D200".to_string()]);
    }

    #[tokio::test]
    async fn test_send_typing_without_capability() {
        let bed = TestBed::new();
        assert_eq!(send_typing(&bed.account, "alice", TypingState::Typing).await, 0);
    }

    #[tokio::test]
    async fn test_send_typing_stopped_or_unknown_peer() {
        let bed = TestBed::with_transport(RecordingTransport::with_typing());
        assert_eq!(send_typing(&bed.account, "alice", TypingState::NotTyping).await, 0);
        assert_eq!(send_typing(&bed.account, "nobody", TypingState::Typing).await, 0);
        assert!(bed.transport.typing_channels().is_empty());
    }

    #[test]
    fn test_render_message_without_ts() {
        let bed = TestBed::new();
        assert!(render_message(&bed.account, &json!({"text": "x"}), MessageFlags::NONE).is_none());
    }
}
