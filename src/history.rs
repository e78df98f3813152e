// ABOUTME: Loads recent conversation history and delivers it oldest first
// ABOUTME: History messages are flagged DELAYED so hosts can render them as backlog

use anyhow::{Context, Result};
use slackline_core::{Conversation, HistoryQuery, MessageFlags};

use crate::account::SlackAccount;
use crate::json::array_field;
use crate::rtm::render_message;

/// Fetch up to `count` messages newer than `since` and deliver them in
/// chronological order. Returns how many messages were delivered.
pub async fn get_history(
    account: &SlackAccount,
    conversation: &Conversation,
    since: Option<&str>,
    count: u16,
) -> Result<usize> {
    let mut query = HistoryQuery::new(conversation.id()).with_limit(count);
    if let Some(since) = since {
        query = query.with_oldest(since);
    }

    let response = account
        .api
        .conversations_history(&query)
        .await
        .with_context(|| format!("Failed to load history for {}", conversation.id()))?;

    let messages = array_field(&response, "messages")
        .with_context(|| format!("History response for {} has no messages", conversation.id()))?;

    // Slack returns newest first
    let mut delivered = 0;
    for message in messages.iter().rev() {
        if let Some(rendered) = render_message(account, message, MessageFlags::DELAYED) {
            account.host.deliver_message(conversation, &rendered);
            delivered += 1;
        }
    }

    tracing::debug!(
        channel = %conversation.id(),
        fetched = messages.len(),
        delivered,
        "Loaded conversation history"
    );
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBed;
    use serde_json::json;

    #[tokio::test]
    async fn test_history_delivered_oldest_first() {
        let bed = TestBed::new();
        bed.api.push_history(Ok(json!({
            "ok": true,
            "messages": [
                {"user": "U200", "text": "third", "ts": "3.000000"},
                {"user": "U300", "text": "second", "ts": "2.000000"},
                {"user": "U001", "text": "first", "ts": "1.000000"}
            ]
        })));

        let delivered = get_history(&bed.account, &bed.general, Some("0.5"), 10)
            .await
            .unwrap();
        assert_eq!(delivered, 3);

        let messages = bed.host.delivered();
        let texts: Vec<&str> = messages.iter().map(|(_, m)| m.html.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(messages
            .iter()
            .all(|(_, m)| m.flags.contains(MessageFlags::DELAYED)));
        assert!(messages[0].1.flags.contains(MessageFlags::SEND));

        let queries = bed.api.queries();
        assert_eq!(queries[0].oldest.as_deref(), Some("0.5"));
        assert_eq!(queries[0].limit, Some(10));
        assert!(!queries[0].inclusive);
    }

    #[tokio::test]
    async fn test_history_error_propagates() {
        let bed = TestBed::new();
        bed.api.push_history(Err(anyhow::anyhow!("ratelimited")));
        let err = get_history(&bed.account, &bed.general, None, 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("C100"));
    }

    #[tokio::test]
    async fn test_history_without_messages_is_error() {
        let bed = TestBed::new();
        bed.api
            .push_history(Ok(json!({"ok": false, "error": "not_in_channel"})));
        assert!(get_history(&bed.account, &bed.general, None, 5).await.is_err());
    }
}
