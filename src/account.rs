// ABOUTME: SlackAccount bundles the collaborators one logged-in account works through
// ABOUTME: Routes outgoing messages to channel or direct transport, with optional thread tagging

use anyhow::Result;
use slackline_core::config::ThreadConfig;
use slackline_core::{
    ChatTransport, Conversation, ConversationKind, Directory, HostSink, MessageFlags, SendStatus,
    SlackApi,
};
use std::sync::Arc;

use crate::markup;

/// Default number of messages loaded by a history fetch
const DEFAULT_HISTORY_COUNT: u16 = 50;

/// Everything a Slack account talks to. Cheap to clone.
#[derive(Clone)]
pub struct SlackAccount {
    pub api: Arc<dyn SlackApi>,
    pub transport: Arc<dyn ChatTransport>,
    pub host: Arc<dyn HostSink>,
    pub directory: Arc<dyn Directory>,
    pub threads: ThreadConfig,
    pub history_count: u16,
}

impl SlackAccount {
    pub fn new(
        api: Arc<dyn SlackApi>,
        transport: Arc<dyn ChatTransport>,
        host: Arc<dyn HostSink>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            api,
            transport,
            host,
            directory,
            threads: ThreadConfig::default(),
            history_count: DEFAULT_HISTORY_COUNT,
        }
    }

    pub fn with_thread_config(mut self, threads: ThreadConfig) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_history_count(mut self, count: u16) -> Self {
        self.history_count = count;
        self
    }

    /// Send host markup to the conversation, tagged with its active thread.
    pub async fn send_message(
        &self,
        conversation: &Conversation,
        html: &str,
        flags: MessageFlags,
    ) -> Result<SendStatus> {
        let thread_ts = conversation.active_thread();
        self.route(conversation, html, flags, thread_ts.as_deref())
            .await
    }

    /// Send host markup as a reply in the thread rooted at `thread_ts`.
    /// The conversation's active thread is neither read nor changed.
    pub async fn send_message_in_thread(
        &self,
        conversation: &Conversation,
        thread_ts: &str,
        html: &str,
        flags: MessageFlags,
    ) -> Result<SendStatus> {
        self.route(conversation, html, flags, Some(thread_ts)).await
    }

    /// Show a local system notice in the conversation
    pub fn write_system(&self, conversation: &Conversation, text: &str) {
        self.host
            .write_system_message(conversation, text, MessageFlags::SYSTEM);
    }

    async fn route(
        &self,
        conversation: &Conversation,
        html: &str,
        flags: MessageFlags,
        thread_ts: Option<&str>,
    ) -> Result<SendStatus> {
        let text = markup::html_to_message(self, html, flags);
        match conversation.kind() {
            ConversationKind::Channel => {
                self.transport
                    .send_channel_message(conversation.id(), &text, flags, thread_ts)
                    .await
            }
            ConversationKind::Direct { peer_id } => {
                self.transport
                    .send_direct_message(peer_id, &text, flags, thread_ts)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SentMessage, TestBed};

    #[tokio::test]
    async fn test_plain_send_uses_active_thread() {
        let bed = TestBed::new();
        bed.general.set_active_thread(Some("5.000001".to_string()));

        let status = bed
            .account
            .send_message(&bed.general, "hello", MessageFlags::NONE)
            .await
            .unwrap();
        assert_eq!(status, SendStatus::Sent);

        let sent = bed.transport.sent();
        assert_eq!(
            sent,
            vec![SentMessage {
                target: "C100".to_string(),
                direct: false,
                text: "hello".to_string(),
                thread_ts: Some("5.000001".to_string()),
            }]
        );
        assert_eq!(bed.general.active_thread().as_deref(), Some("5.000001"));
    }

    #[tokio::test]
    async fn test_threaded_send_leaves_active_thread_alone() {
        let bed = TestBed::new();
        bed.general.set_active_thread(Some("5.000001".to_string()));

        bed.account
            .send_message_in_thread(&bed.general, "9.000009", "reply", MessageFlags::NONE)
            .await
            .unwrap();

        let sent = bed.transport.sent();
        assert_eq!(sent[0].thread_ts.as_deref(), Some("9.000009"));
        assert_eq!(bed.general.active_thread().as_deref(), Some("5.000001"));
    }

    #[tokio::test]
    async fn test_direct_conversation_routes_to_peer() {
        let bed = TestBed::new();
        bed.account
            .send_message(&bed.alice_dm, "hi <b>there</b>", MessageFlags::NONE)
            .await
            .unwrap();

        let sent = bed.transport.sent();
        assert_eq!(sent[0].target, "U200");
        assert!(sent[0].direct);
        assert_eq!(sent[0].text, "hi *there*");
        assert!(sent[0].thread_ts.is_none());
    }

    #[test]
    fn test_write_system_flags() {
        let bed = TestBed::new();
        bed.account.write_system(&bed.general, "notice");
        let written = bed.host.system_messages();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, "C100");
        assert_eq!(written[0].1, "notice");
        assert!(written[0].2.contains(MessageFlags::SYSTEM));
    }
}
