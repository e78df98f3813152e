// ABOUTME: Platform-facing model for the slackline Slack bridge
// ABOUTME: Conversations, collaborator traits, directory, configuration, and paths

pub mod config;
pub mod directory;
pub mod paths;
pub mod traits;

pub use directory::StaticDirectory;

// Re-export core traits for convenient access
pub use traits::{
    // Collaborators
    ChatTransport, Directory, HostSink, SlackApi, ThreadReplies, TypingTransport,
    // Data Types
    ChatUser, Conversation, ConversationKind, HistoryQuery, MessageFlags, RenderedMessage,
    SendStatus, TypingState,
};
