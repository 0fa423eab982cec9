use std::future::Future;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use haven_types::api::{AddReactionRequest, MessageResponse, SendMessageRequest};
use haven_types::{ChannelId, ChannelMember, Message, MessageId};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// REST collaborator used by a channel session.
///
/// Reaction add/remove are idempotent on the server; toggling is derived on
/// the client.
pub trait ChatApi: Send + Sync {
    fn fetch_messages(&self, channel_id: &ChannelId) -> impl Future<Output = Result<Vec<Message>>> + Send;

    fn send_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
        parent: Option<&MessageId>,
    ) -> impl Future<Output = Result<Message>> + Send;

    fn add_reaction(&self, message_id: &MessageId, emoji: &str) -> impl Future<Output = Result<()>> + Send;

    fn remove_reaction(&self, message_id: &MessageId, emoji: &str) -> impl Future<Output = Result<()>> + Send;

    fn fetch_members(&self, channel_id: &ChannelId) -> impl Future<Output = Result<Vec<ChannelMember>>> + Send;
}

/// [`ChatApi`] over the Haven REST routes.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClientError::Config(format!("HAVEN_TOKEN: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base: config.api_url.clone(),
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl ChatApi for HttpApi {
    async fn fetch_messages(&self, channel_id: &ChannelId) -> Result<Vec<Message>> {
        let url = self.endpoint(&["messages", "channel", channel_id.as_str()])?;
        let wire: Vec<MessageResponse> = decode(self.client.get(url).send().await?).await?;
        debug!(channel = %channel_id, count = wire.len(), "fetched messages");
        Ok(wire.into_iter().map(|m| m.into_message(channel_id)).collect())
    }

    async fn send_message(
        &self,
        channel_id: &ChannelId,
        content: &str,
        parent: Option<&MessageId>,
    ) -> Result<Message> {
        let url = self.endpoint(&["messages", "channel", channel_id.as_str()])?;
        let body = SendMessageRequest {
            content: content.to_string(),
            parent_message_id: parent.cloned(),
        };
        let wire: MessageResponse = decode(self.client.post(url).json(&body).send().await?).await?;
        Ok(wire.into_message(channel_id))
    }

    async fn add_reaction(&self, message_id: &MessageId, emoji: &str) -> Result<()> {
        let url = self.endpoint(&["messages", message_id.as_str(), "reactions"])?;
        let body = AddReactionRequest {
            emoji: emoji.to_string(),
        };
        check(self.client.post(url).json(&body).send().await?).await?;
        Ok(())
    }

    async fn remove_reaction(&self, message_id: &MessageId, emoji: &str) -> Result<()> {
        let url = self.endpoint(&["messages", message_id.as_str(), "reactions", emoji])?;
        check(self.client.delete(url).send().await?).await?;
        Ok(())
    }

    async fn fetch_members(&self, channel_id: &ChannelId) -> Result<Vec<ChannelMember>> {
        let url = self.endpoint(&["channels", channel_id.as_str(), "members"])?;
        decode(self.client.get(url).send().await?).await
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let preview: String = body.chars().take(200).collect();
    warn!(status = status.as_u16(), body = %preview, "request failed");
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::new(&ClientConfig::new(base, "alice").unwrap()).unwrap()
    }

    #[test]
    fn endpoints_keep_base_path() {
        let api = api("https://chat.example.com/api");
        let url = api.endpoint(&["messages", "channel", "general"]).unwrap();
        assert_eq!(url.as_str(), "https://chat.example.com/api/messages/channel/general");
    }

    #[test]
    fn emoji_segments_are_encoded() {
        let api = api("http://localhost:5001");
        let url = api.endpoint(&["messages", "m1", "reactions", "👍"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5001/messages/m1/reactions/%F0%9F%91%8D");
    }

    #[test]
    fn invalid_token_is_a_config_error() {
        let mut config = ClientConfig::new("http://localhost:5001", "alice").unwrap();
        config.token = Some("bad\ntoken".into());
        assert!(matches!(HttpApi::new(&config), Err(ClientError::Config(_))));
    }
}
