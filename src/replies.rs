// ABOUTME: Fetches the replies of one thread through conversations.replies
// ABOUTME: Each reply is rendered and delivered to the thread's conversation as backlog

use anyhow::{Context, Result};
use async_trait::async_trait;
use slackline_core::{Conversation, MessageFlags, ThreadReplies};
use std::sync::Arc;

use crate::account::SlackAccount;
use crate::json::array_field;
use crate::rtm::render_message;

/// [`ThreadReplies`] backed by the account's Web API
pub struct SlackReplies {
    account: SlackAccount,
}

impl SlackReplies {
    pub fn new(account: SlackAccount) -> Self {
        Self { account }
    }
}

#[async_trait]
impl ThreadReplies for SlackReplies {
    async fn fetch_replies(&self, conversation: Arc<Conversation>, ts: &str) -> Result<()> {
        let response = self
            .account
            .api
            .conversations_replies(conversation.id(), ts)
            .await
            .with_context(|| format!("Failed to fetch replies for thread {}", ts))?;

        let messages = array_field(&response, "messages")
            .with_context(|| format!("Replies response for thread {} has no messages", ts))?;

        for message in messages {
            if let Some(rendered) = render_message(&self.account, message, MessageFlags::DELAYED) {
                self.account.host.deliver_message(&conversation, &rendered);
            }
        }

        tracing::debug!(
            channel = %conversation.id(),
            thread_ts = %ts,
            count = messages.len(),
            "Delivered thread replies"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBed;
    use serde_json::json;

    #[tokio::test]
    async fn test_replies_delivered_in_order() {
        let bed = TestBed::new();
        bed.api.push_replies(Ok(json!({
            "ok": true,
            "messages": [
                {"user": "U200", "text": "root", "ts": "1.000001", "thread_ts": "1.000001"},
                {"user": "U300", "text": "answer", "ts": "1.000500", "thread_ts": "1.000001"}
            ]
        })));

        let replies = SlackReplies::new(bed.account.clone());
        replies
            .fetch_replies(Arc::clone(&bed.general), "1.000001")
            .await
            .unwrap();

        assert_eq!(
            bed.api.reply_requests(),
            vec![("C100".to_string(), "1.000001".to_string())]
        );
        let delivered = bed.host.delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].1.html, "root");
        assert!(delivered[1].1.html.ends_with("answer"));
        assert!(delivered[1].1.html.contains("[1.000001]"));
    }

    #[tokio::test]
    async fn test_replies_error_propagates() {
        let bed = TestBed::new();
        bed.api.push_replies(Ok(json!({"ok": false, "error": "thread_not_found"})));
        let replies = SlackReplies::new(bed.account.clone());
        assert!(replies
            .fetch_replies(Arc::clone(&bed.general), "1.000001")
            .await
            .is_err());
        assert!(bed.host.delivered().is_empty());
    }
}
