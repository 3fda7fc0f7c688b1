//! # Backend HTTP Client
//!
//! `RelayApi` over `reqwest`: the channel directory and verify endpoints use
//! bearer auth with the bot secret; the command webhook carries its token in the
//! JSON body. Replies are returned with their status and a leniently parsed body
//! so callers can decide what a non-2xx or non-JSON reply means.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::domain::config::{ApiConfig, Secret};
use crate::domain::errors::ApiError;
use crate::domain::traits::{ApiReply, CommandRequest, RelayApi, ReplyBody};
use crate::domain::types::ChannelName;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    channel: &'a str,
    code: &'a str,
}

pub struct HttpRelayApi {
    client: Client,
    channels_url: String,
    verify_url: String,
    webhook_url: String,
    secret: Secret,
}

impl HttpRelayApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("cuhz-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            channels_url: config.channels_url(),
            verify_url: config.verify_url(),
            webhook_url: config.webhook_url.clone(),
            secret: config.secret.clone(),
        })
    }
}

/// Read status and body; a body that is not JSON is kept as raw text.
async fn into_reply(response: reqwest::Response) -> Result<ApiReply, ApiError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    Ok(ApiReply {
        status,
        body: ReplyBody::parse(&text),
    })
}

#[async_trait]
impl RelayApi for HttpRelayApi {
    async fn fetch_channels(&self) -> Result<ApiReply, ApiError> {
        let response = self
            .client
            .get(&self.channels_url)
            .bearer_auth(self.secret.expose())
            .send()
            .await?;
        into_reply(response).await
    }

    async fn verify(&self, channel: &ChannelName, code: &str) -> Result<ApiReply, ApiError> {
        let response = self
            .client
            .post(&self.verify_url)
            .bearer_auth(self.secret.expose())
            .json(&VerifyRequest {
                channel: channel.as_str(),
                code,
            })
            .send()
            .await?;
        into_reply(response).await
    }

    async fn send_command(&self, request: &CommandRequest) -> Result<ApiReply, ApiError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(request)
            .send()
            .await?;
        into_reply(response).await
    }
}
