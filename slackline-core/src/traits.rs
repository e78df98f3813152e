// ABOUTME: Conversation model and collaborator traits for the Slack bridge
// ABOUTME: Web API, chat transport, host display sink, reply fetching, and directory lookups

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, Mutex};

// =============================================================================
// Message Flags
// =============================================================================

/// Host-side message flags, carried alongside rendered and outgoing text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MessageFlags(u32);

impl MessageFlags {
    pub const NONE: Self = Self(0);
    /// Outgoing message written by the local user
    pub const SEND: Self = Self(0x0001);
    /// Incoming message from another user
    pub const RECV: Self = Self(0x0002);
    /// Notice generated locally, not by any user
    pub const SYSTEM: Self = Self(0x0004);
    pub const NO_LOG: Self = Self(0x0040);
    /// Message replayed from history
    pub const DELAYED: Self = Self(0x0400);
    /// Text must not be run through further markup processing
    pub const RAW: Self = Self(0x0800);
    pub const NOTIFY: Self = Self(0x4000);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for MessageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MessageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// =============================================================================
// User Identity
// =============================================================================

/// Identity of a Slack user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatUser {
    /// Slack user ID (e.g., U12345678)
    pub id: String,
    /// Display name, when the directory knows it
    pub display_name: Option<String>,
}

impl ChatUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(name.into()),
        }
    }

    /// Name to show in the host, falling back to the raw ID
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

// =============================================================================
// Conversations
// =============================================================================

/// What kind of Slack conversation a [`Conversation`] wraps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationKind {
    /// Public or private channel; sends go to the channel ID
    Channel,
    /// Direct message with a single peer; sends are addressed to the peer
    Direct { peer_id: String },
}

/// A channel or direct-message conversation.
///
/// Shared as `Arc<Conversation>` between the host, the directory, and any
/// in-flight thread operation. The active thread is the conversation's
/// "currently selected thread": plain sends are tagged with it.
#[derive(Debug)]
pub struct Conversation {
    id: String,
    name: String,
    kind: ConversationKind,
    active_thread: Mutex<Option<String>>,
}

impl Conversation {
    pub fn channel(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ConversationKind::Channel,
            active_thread: Mutex::new(None),
        }
    }

    pub fn direct(
        id: impl Into<String>,
        peer_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ConversationKind::Direct {
                peer_id: peer_id.into(),
            },
            active_thread: Mutex::new(None),
        }
    }

    /// Slack conversation ID (C..., G..., or D...)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ConversationKind {
        &self.kind
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.kind, ConversationKind::Direct { .. })
    }

    pub fn active_thread(&self) -> Option<String> {
        self.active_thread
            .lock()
            .map(|ts| ts.clone())
            .unwrap_or(None)
    }

    /// Replace the active thread, returning the previous one
    pub fn set_active_thread(&self, ts: Option<String>) -> Option<String> {
        match self.active_thread.lock() {
            Ok(mut current) => std::mem::replace(&mut *current, ts),
            Err(_) => None,
        }
    }
}

// =============================================================================
// Rendered messages and typing
// =============================================================================

/// A Slack message translated into host markup, ready for display
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub sender: ChatUser,
    /// Host markup body
    pub html: String,
    pub flags: MessageFlags,
    /// Slack message timestamp (canonical form)
    pub ts: String,
    /// Root of the thread this message belongs to, if any
    pub thread_ts: Option<String>,
    /// Seconds since Unix epoch
    pub timestamp: i64,
}

/// Typing state as the host understands it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingState {
    NotTyping,
    Typing,
    Typed,
}

/// Immediate result of handing a message to the transport.
/// Delivery itself is not confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// The target cannot receive messages through this transport
    NotApplicable,
}

// =============================================================================
// History queries
// =============================================================================

/// Parameters for a `conversations.history` request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub channel_id: String,
    pub oldest: Option<String>,
    pub latest: Option<String>,
    pub inclusive: bool,
    pub limit: Option<u16>,
}

impl HistoryQuery {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            ..Self::default()
        }
    }

    pub fn with_oldest(mut self, oldest: impl Into<String>) -> Self {
        self.oldest = Some(oldest.into());
        self
    }

    pub fn with_latest(mut self, latest: impl Into<String>) -> Self {
        self.latest = Some(latest.into());
        self
    }

    pub fn with_inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    pub fn with_limit(mut self, limit: u16) -> Self {
        self.limit = Some(limit);
        self
    }
}

// =============================================================================
// Collaborator traits
// =============================================================================

/// Slack Web API calls that return raw response JSON.
///
/// Each call resolves exactly once, with either the response body or a
/// transport-level error.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `conversations.history` restricted by the query's window and limit
    async fn conversations_history(&self, query: &HistoryQuery) -> Result<Value>;

    /// `conversations.replies` for the thread rooted at `ts`
    async fn conversations_replies(&self, channel_id: &str, ts: &str) -> Result<Value>;
}

/// Outgoing message transport
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post to a channel, optionally as a reply in the thread rooted at `thread_ts`
    async fn send_channel_message(
        &self,
        channel_id: &str,
        text: &str,
        flags: MessageFlags,
        thread_ts: Option<&str>,
    ) -> Result<SendStatus>;

    /// Post to a user's direct-message conversation
    async fn send_direct_message(
        &self,
        peer_id: &str,
        text: &str,
        flags: MessageFlags,
        thread_ts: Option<&str>,
    ) -> Result<SendStatus>;

    /// Optional: typing notifications
    fn typing(&self) -> Option<&dyn TypingTransport> {
        None
    }
}

/// Typing notification capability (RTM only; the Web API has none)
#[async_trait]
pub trait TypingTransport: Send + Sync {
    async fn send_typing(&self, channel_id: &str) -> Result<()>;
}

/// Host application display surface
pub trait HostSink: Send + Sync {
    /// Show a local notice in the conversation window
    fn write_system_message(&self, conversation: &Conversation, text: &str, flags: MessageFlags);

    /// Show a message that arrived from Slack
    fn deliver_message(&self, conversation: &Conversation, message: &RenderedMessage);

    /// Update a peer's typing indicator
    fn user_typing(&self, _conversation: &Conversation, _user: &ChatUser, _state: TypingState) {}
}

/// Renders the full reply list of a thread
#[async_trait]
pub trait ThreadReplies: Send + Sync {
    async fn fetch_replies(&self, conversation: Arc<Conversation>, ts: &str) -> Result<()>;
}

/// User and conversation lookups owned by the account
pub trait Directory: Send + Sync {
    /// The logged-in user's Slack ID
    fn self_user_id(&self) -> &str;

    fn user_name(&self, user_id: &str) -> Option<String>;

    fn user_id_by_name(&self, name: &str) -> Option<String>;

    fn channel_name(&self, channel_id: &str) -> Option<String>;

    fn channel_id_by_name(&self, name: &str) -> Option<String>;

    /// Conversation for any channel or DM conversation ID
    fn conversation(&self, id: &str) -> Option<Arc<Conversation>>;

    /// Direct-message conversation with a user
    fn direct_conversation(&self, user_id: &str) -> Option<Arc<Conversation>>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine_and_contain() {
        let mut flags = MessageFlags::RECV | MessageFlags::DELAYED;
        assert!(flags.contains(MessageFlags::RECV));
        assert!(flags.contains(MessageFlags::DELAYED));
        assert!(!flags.contains(MessageFlags::SYSTEM));

        flags.insert(MessageFlags::RAW);
        assert!(flags.contains(MessageFlags::RAW));
        flags.remove(MessageFlags::RECV);
        assert!(!flags.contains(MessageFlags::RECV));
    }

    #[test]
    fn test_flags_default_is_empty() {
        assert_eq!(MessageFlags::default(), MessageFlags::NONE);
        assert_eq!(MessageFlags::default().bits(), 0);
    }

    #[test]
    fn test_chat_user_label_falls_back_to_id() {
        assert_eq!(ChatUser::new("U1").label(), "U1");
        assert_eq!(ChatUser::with_name("U1", "alice").label(), "alice");
    }

    #[test]
    fn test_conversation_active_thread_replace() {
        let conv = Conversation::channel("C123", "general");
        assert!(conv.active_thread().is_none());

        let previous = conv.set_active_thread(Some("1.000001".to_string()));
        assert!(previous.is_none());
        assert_eq!(conv.active_thread().as_deref(), Some("1.000001"));

        let previous = conv.set_active_thread(None);
        assert_eq!(previous.as_deref(), Some("1.000001"));
        assert!(conv.active_thread().is_none());
    }

    #[test]
    fn test_conversation_kinds() {
        let chan = Conversation::channel("C123", "general");
        assert!(!chan.is_direct());
        assert_eq!(chan.kind(), &ConversationKind::Channel);

        let dm = Conversation::direct("D456", "U789", "bob");
        assert!(dm.is_direct());
        assert_eq!(
            dm.kind(),
            &ConversationKind::Direct {
                peer_id: "U789".to_string()
            }
        );
        assert_eq!(dm.id(), "D456");
        assert_eq!(dm.name(), "bob");
    }

    #[test]
    fn test_history_query_builder() {
        let query = HistoryQuery::new("C1")
            .with_oldest("10.000000")
            .with_latest("10.999999")
            .with_inclusive(true)
            .with_limit(5);
        assert_eq!(query.channel_id, "C1");
        assert_eq!(query.oldest.as_deref(), Some("10.000000"));
        assert_eq!(query.latest.as_deref(), Some("10.999999"));
        assert!(query.inclusive);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_conversation_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Conversation>();
    }
}
