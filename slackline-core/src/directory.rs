// ABOUTME: In-memory Directory implementation backed by hash maps
// ABOUTME: Used by the CLI (populated from config) and by tests

use crate::traits::{Conversation, Directory};
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed user and conversation tables.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    self_user_id: String,
    users: HashMap<String, String>,
    channels: HashMap<String, String>,
    conversations: HashMap<String, Arc<Conversation>>,
    /// user ID -> DM conversation ID
    direct: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn new(self_user_id: impl Into<String>) -> Self {
        Self {
            self_user_id: self_user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.users.insert(id.into(), name.into());
        self
    }

    /// Register a channel conversation and return its shared handle
    pub fn add_channel(&mut self, id: &str, name: &str) -> Arc<Conversation> {
        let conv = Arc::new(Conversation::channel(id, name));
        self.channels.insert(id.to_string(), name.to_string());
        self.conversations.insert(id.to_string(), Arc::clone(&conv));
        conv
    }

    /// Register a DM conversation with `peer_id`
    pub fn add_direct(&mut self, id: &str, peer_id: &str) -> Arc<Conversation> {
        let name = self
            .users
            .get(peer_id)
            .cloned()
            .unwrap_or_else(|| peer_id.to_string());
        let conv = Arc::new(Conversation::direct(id, peer_id, name));
        self.direct.insert(peer_id.to_string(), id.to_string());
        self.conversations.insert(id.to_string(), Arc::clone(&conv));
        conv
    }
}

impl Directory for StaticDirectory {
    fn self_user_id(&self) -> &str {
        &self.self_user_id
    }

    fn user_name(&self, user_id: &str) -> Option<String> {
        self.users.get(user_id).cloned()
    }

    fn user_id_by_name(&self, name: &str) -> Option<String> {
        self.users
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| id.clone())
    }

    fn channel_name(&self, channel_id: &str) -> Option<String> {
        self.channels.get(channel_id).cloned()
    }

    fn channel_id_by_name(&self, name: &str) -> Option<String> {
        self.channels
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| id.clone())
    }

    fn conversation(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations.get(id).cloned()
    }

    fn direct_conversation(&self, user_id: &str) -> Option<Arc<Conversation>> {
        self.direct
            .get(user_id)
            .and_then(|id| self.conversations.get(id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_users_both_ways() {
        let dir = StaticDirectory::new("U0").with_user("U1", "alice");
        assert_eq!(dir.self_user_id(), "U0");
        assert_eq!(dir.user_name("U1").as_deref(), Some("alice"));
        assert_eq!(dir.user_id_by_name("alice").as_deref(), Some("U1"));
        assert!(dir.user_name("U2").is_none());
    }

    #[test]
    fn test_channel_registration_shares_handle() {
        let mut dir = StaticDirectory::new("U0");
        let conv = dir.add_channel("C1", "general");
        let looked_up = dir.conversation("C1").unwrap();
        assert!(Arc::ptr_eq(&conv, &looked_up));
        assert_eq!(dir.channel_id_by_name("general").as_deref(), Some("C1"));
        assert_eq!(dir.channel_name("C1").as_deref(), Some("general"));
    }

    #[test]
    fn test_direct_conversation_uses_peer_name() {
        let mut dir = StaticDirectory::new("U0").with_user("U1", "alice");
        let conv = dir.add_direct("D1", "U1");
        assert_eq!(conv.name(), "alice");
        assert!(conv.is_direct());
        assert_eq!(dir.direct_conversation("U1").unwrap().id(), "D1");
        assert!(dir.direct_conversation("U9").is_none());
    }
}
