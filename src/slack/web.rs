// ABOUTME: SlackWebClient implements SlackApi and ChatTransport over the Slack Web API
// ABOUTME: History and replies responses are handed on as JSON for the rendering layer

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use slack_morphism::prelude::*;
use slackline_core::config::SlackConfig;
use slackline_core::{ChatTransport, HistoryQuery, MessageFlags, SendStatus, SlackApi};
use std::sync::Arc;

/// Web API client for one bot token
pub struct SlackWebClient {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
    self_user_id: String,
    team: String,
}

impl SlackWebClient {
    /// Create the client and resolve our own user ID via `auth.test`.
    pub async fn connect(config: &SlackConfig) -> Result<Self> {
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("Failed to create Slack HTTP connector")?,
        ));
        let token = SlackApiToken::new(SlackApiTokenValue(config.bot_token.clone()));

        let session = client.open_session(&token);
        let auth = session
            .auth_test()
            .await
            .context("Failed to call Slack auth.test, check bot_token")?;

        let self_user_id = auth.user_id.to_string();
        let team = auth.team.to_string();
        tracing::info!(user = %self_user_id, team = %team, "Slack account authenticated");

        Ok(Self {
            client,
            token,
            self_user_id,
            team,
        })
    }

    pub fn self_user_id(&self) -> &str {
        &self.self_user_id
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    async fn post(&self, channel_id: &str, text: &str, thread_ts: Option<&str>) -> Result<()> {
        let session = self.client.open_session(&self.token);

        let mut req = SlackApiChatPostMessageRequest::new(
            channel_id.into(),
            SlackMessageContent::new().with_text(text.to_string()),
        );
        if let Some(ts) = thread_ts {
            req = req.with_thread_ts(ts.into());
        }

        session
            .chat_post_message(&req)
            .await
            .context("Failed to send Slack message")?;
        Ok(())
    }

    async fn open_direct(&self, peer_id: &str) -> Result<String> {
        let session = self.client.open_session(&self.token);

        let req = SlackApiConversationsOpenRequest::new().with_users(vec![peer_id.into()]);
        let resp = session
            .conversations_open(&req)
            .await
            .context("Failed to open Slack DM")?;

        Ok(resp.channel.id.to_string())
    }
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn conversations_history(&self, query: &HistoryQuery) -> Result<Value> {
        let session = self.client.open_session(&self.token);

        let mut req = SlackApiConversationsHistoryRequest::new()
            .with_channel(query.channel_id.as_str().into())
            .with_inclusive(query.inclusive);
        if let Some(oldest) = &query.oldest {
            req = req.with_oldest(oldest.as_str().into());
        }
        if let Some(latest) = &query.latest {
            req = req.with_latest(latest.as_str().into());
        }
        if let Some(limit) = query.limit {
            req = req.with_limit(limit);
        }

        let resp = session
            .conversations_history(&req)
            .await
            .with_context(|| format!("conversations.history failed for {}", query.channel_id))?;

        serde_json::to_value(&resp).context("Failed to encode history response")
    }

    async fn conversations_replies(&self, channel_id: &str, ts: &str) -> Result<Value> {
        let session = self.client.open_session(&self.token);

        let req = SlackApiConversationsRepliesRequest::new(channel_id.into(), ts.into());
        let resp = session
            .conversations_replies(&req)
            .await
            .with_context(|| format!("conversations.replies failed for {} {}", channel_id, ts))?;

        serde_json::to_value(&resp).context("Failed to encode replies response")
    }
}

#[async_trait]
impl ChatTransport for SlackWebClient {
    async fn send_channel_message(
        &self,
        channel_id: &str,
        text: &str,
        _flags: MessageFlags,
        thread_ts: Option<&str>,
    ) -> Result<SendStatus> {
        self.post(channel_id, text, thread_ts).await?;
        Ok(SendStatus::Sent)
    }

    async fn send_direct_message(
        &self,
        peer_id: &str,
        text: &str,
        _flags: MessageFlags,
        thread_ts: Option<&str>,
    ) -> Result<SendStatus> {
        let channel_id = self.open_direct(peer_id).await?;
        self.post(&channel_id, text, thread_ts).await?;
        Ok(SendStatus::Sent)
    }
}
