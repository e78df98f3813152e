// ABOUTME: In-memory collaborators for exercising thread resolution and rendering.
// ABOUTME: Scripted Web API, recording transport/host/reply fetcher, and a prebuilt TestBed.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use slackline_core::{
    ChatTransport, ChatUser, Conversation, HistoryQuery, HostSink, MessageFlags, RenderedMessage,
    SendStatus, SlackApi, StaticDirectory, ThreadReplies, TypingState, TypingTransport,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::account::SlackAccount;

// =============================================================================
// Scripted Web API
// =============================================================================

/// Web API fake answering from queued responses.
/// With nothing queued, history and replies calls return an empty list.
#[derive(Default)]
pub struct ScriptedApi {
    history: Mutex<VecDeque<Result<Value>>>,
    replies: Mutex<VecDeque<Result<Value>>>,
    queries: Mutex<Vec<HistoryQuery>>,
    reply_requests: Mutex<Vec<(String, String)>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedApi {
    pub fn push_history(&self, response: Result<Value>) {
        self.history.lock().unwrap().push_back(response);
    }

    pub fn push_replies(&self, response: Result<Value>) {
        self.replies.lock().unwrap().push_back(response);
    }

    /// Hold the next history call until the returned sender fires (or drops)
    pub fn hold_history(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn queries(&self) -> Vec<HistoryQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn reply_requests(&self) -> Vec<(String, String)> {
        self.reply_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlackApi for ScriptedApi {
    async fn conversations_history(&self, query: &HistoryQuery) -> Result<Value> {
        self.queries.lock().unwrap().push(query.clone());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.history
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"ok": true, "messages": []})))
    }

    async fn conversations_replies(&self, channel_id: &str, ts: &str) -> Result<Value> {
        self.reply_requests
            .lock()
            .unwrap()
            .push((channel_id.to_string(), ts.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"ok": true, "messages": []})))
    }
}

// =============================================================================
// Recording transport
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Channel ID for channel sends, peer user ID for direct sends
    pub target: String,
    pub direct: bool,
    pub text: String,
    pub thread_ts: Option<String>,
}

/// Transport fake that records every send
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: Mutex<bool>,
    typing: Option<RecordingTyping>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: Mutex::new(false),
            typing: None,
        }
    }

    pub fn with_typing() -> Self {
        Self {
            typing: Some(RecordingTyping::default()),
            ..Self::new()
        }
    }

    /// Make every later send return an error
    pub fn fail_sends(&self) {
        *self.fail_sends.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn typing_channels(&self) -> Vec<String> {
        self.typing
            .as_ref()
            .map(|t| t.channels.lock().unwrap().clone())
            .unwrap_or_default()
    }

    fn record(&self, target: &str, direct: bool, text: &str, thread_ts: Option<&str>) -> Result<SendStatus> {
        if *self.fail_sends.lock().unwrap() {
            anyhow::bail!("transport offline");
        }
        self.sent.lock().unwrap().push(SentMessage {
            target: target.to_string(),
            direct,
            text: text.to_string(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok(SendStatus::Sent)
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_channel_message(
        &self,
        channel_id: &str,
        text: &str,
        _flags: MessageFlags,
        thread_ts: Option<&str>,
    ) -> Result<SendStatus> {
        self.record(channel_id, false, text, thread_ts)
    }

    async fn send_direct_message(
        &self,
        peer_id: &str,
        text: &str,
        _flags: MessageFlags,
        thread_ts: Option<&str>,
    ) -> Result<SendStatus> {
        self.record(peer_id, true, text, thread_ts)
    }

    fn typing(&self) -> Option<&dyn TypingTransport> {
        self.typing.as_ref().map(|t| t as &dyn TypingTransport)
    }
}

#[derive(Default)]
pub struct RecordingTyping {
    channels: Mutex<Vec<String>>,
}

#[async_trait]
impl TypingTransport for RecordingTyping {
    async fn send_typing(&self, channel_id: &str) -> Result<()> {
        self.channels.lock().unwrap().push(channel_id.to_string());
        Ok(())
    }
}

// =============================================================================
// Recording host
// =============================================================================

/// Host fake collecting everything shown to the user
#[derive(Default)]
pub struct RecordingHost {
    system: Mutex<Vec<(String, String, MessageFlags)>>,
    delivered: Mutex<Vec<(String, RenderedMessage)>>,
    typing: Mutex<Vec<(String, String, TypingState)>>,
}

impl RecordingHost {
    /// (conversation id, text, flags)
    pub fn system_messages(&self) -> Vec<(String, String, MessageFlags)> {
        self.system.lock().unwrap().clone()
    }

    /// (conversation id, message)
    pub fn delivered(&self) -> Vec<(String, RenderedMessage)> {
        self.delivered.lock().unwrap().clone()
    }

    /// (conversation id, user id, state)
    pub fn typing(&self) -> Vec<(String, String, TypingState)> {
        self.typing.lock().unwrap().clone()
    }
}

impl HostSink for RecordingHost {
    fn write_system_message(&self, conversation: &Conversation, text: &str, flags: MessageFlags) {
        self.system
            .lock()
            .unwrap()
            .push((conversation.id().to_string(), text.to_string(), flags));
    }

    fn deliver_message(&self, conversation: &Conversation, message: &RenderedMessage) {
        self.delivered
            .lock()
            .unwrap()
            .push((conversation.id().to_string(), message.clone()));
    }

    fn user_typing(&self, conversation: &Conversation, user: &ChatUser, state: TypingState) {
        self.typing
            .lock()
            .unwrap()
            .push((conversation.id().to_string(), user.id.clone(), state));
    }
}

// =============================================================================
// Recording reply fetcher
// =============================================================================

#[derive(Default)]
pub struct RecordingReplies {
    fetched: Mutex<Vec<(String, String)>>,
}

impl RecordingReplies {
    /// (conversation id, thread ts)
    pub fn fetched(&self) -> Vec<(String, String)> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThreadReplies for RecordingReplies {
    async fn fetch_replies(&self, conversation: Arc<Conversation>, ts: &str) -> Result<()> {
        self.fetched
            .lock()
            .unwrap()
            .push((conversation.id().to_string(), ts.to_string()));
        Ok(())
    }
}

// =============================================================================
// TestBed
// =============================================================================

/// A wired-up account: self user U001 ("me"), users alice (U200) and bob (U300),
/// channel C100 "general", and a DM D200 with alice.
pub struct TestBed {
    pub api: Arc<ScriptedApi>,
    pub transport: Arc<RecordingTransport>,
    pub host: Arc<RecordingHost>,
    pub replies: Arc<RecordingReplies>,
    pub account: SlackAccount,
    pub general: Arc<Conversation>,
    pub alice_dm: Arc<Conversation>,
}

impl TestBed {
    pub fn new() -> Self {
        Self::with_transport(RecordingTransport::new())
    }

    pub fn with_transport(transport: RecordingTransport) -> Self {
        let mut directory = StaticDirectory::new("U001")
            .with_user("U001", "me")
            .with_user("U200", "alice")
            .with_user("U300", "bob");
        let general = directory.add_channel("C100", "general");
        let alice_dm = directory.add_direct("D200", "U200");

        let api = Arc::new(ScriptedApi::default());
        let transport = Arc::new(transport);
        let host = Arc::new(RecordingHost::default());
        let replies = Arc::new(RecordingReplies::default());
        let account = SlackAccount::new(
            api.clone(),
            transport.clone(),
            host.clone(),
            Arc::new(directory),
        );

        Self {
            api,
            transport,
            host,
            replies,
            account,
            general,
            alice_dm,
        }
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}
