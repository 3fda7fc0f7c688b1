//! In-memory fakes for the chat transport and HTTP backend.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::application::forwarder::GenerationForwarder;
use crate::application::membership::{ChannelSynchronizer, SyncTrigger};
use crate::application::router::CommandRouter;
use crate::application::state::{RelayState, SharedState};
use crate::domain::config::{Secret, TuningConfig};
use crate::domain::errors::{ApiError, TransportError};
use crate::domain::traits::{ApiReply, ChatTransport, CommandRequest, RelayApi, ReplyBody};
use crate::domain::types::{ChannelName, ChatMessage, Invoker};

pub const DASHBOARD: &str = "https://dash.example";

#[derive(Default)]
pub struct FakeChat {
    pub said: Mutex<Vec<(String, String)>>,
    pub joins: Mutex<Vec<String>>,
    pub parts: Mutex<Vec<String>>,
    pub join_results: Mutex<HashMap<String, VecDeque<Result<(), TransportError>>>>,
}

impl FakeChat {
    pub fn said(&self) -> Vec<(String, String)> {
        self.said.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.said().into_iter().map(|(_, text)| text).collect()
    }

    pub fn fail_next_join(&self, channel: &str, error: TransportError) {
        self.join_results
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push_back(Err(error));
    }
}

#[async_trait]
impl ChatTransport for FakeChat {
    async fn say(&self, channel: &ChannelName, text: &str) -> Result<(), TransportError> {
        self.said
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn join(&self, channel: &ChannelName) -> Result<(), TransportError> {
        self.joins.lock().unwrap().push(channel.to_string());
        self.join_results
            .lock()
            .unwrap()
            .get_mut(channel.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }

    async fn part(&self, channel: &ChannelName) -> Result<(), TransportError> {
        self.parts.lock().unwrap().push(channel.to_string());
        Ok(())
    }
}

pub fn reply(status: u16, body: Value) -> Result<ApiReply, ApiError> {
    Ok(ApiReply {
        status,
        body: ReplyBody::Json(body),
    })
}

/// Scripted backend. Empty scripts fall back to a successful default.
#[derive(Default)]
pub struct FakeApi {
    pub channels: Mutex<VecDeque<Result<ApiReply, ApiError>>>,
    pub verifies: Mutex<VecDeque<Result<ApiReply, ApiError>>>,
    pub commands: Mutex<VecDeque<Result<ApiReply, ApiError>>>,
    pub verify_calls: Mutex<Vec<(String, String)>>,
    pub command_calls: Mutex<Vec<CommandRequest>>,
    pub channel_calls: Mutex<usize>,
}

impl FakeApi {
    pub fn push_channels(&self, r: Result<ApiReply, ApiError>) {
        self.channels.lock().unwrap().push_back(r);
    }

    pub fn push_verify(&self, r: Result<ApiReply, ApiError>) {
        self.verifies.lock().unwrap().push_back(r);
    }

    pub fn push_command(&self, r: Result<ApiReply, ApiError>) {
        self.commands.lock().unwrap().push_back(r);
    }

    pub fn command_calls(&self) -> Vec<CommandRequest> {
        self.command_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayApi for FakeApi {
    async fn fetch_channels(&self) -> Result<ApiReply, ApiError> {
        *self.channel_calls.lock().unwrap() += 1;
        self.channels
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| reply(200, json!({ "channelLogins": [] })))
    }

    async fn verify(&self, channel: &ChannelName, code: &str) -> Result<ApiReply, ApiError> {
        self.verify_calls
            .lock()
            .unwrap()
            .push((channel.to_string(), code.to_string()));
        self.verifies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| reply(200, json!({ "success": true })))
    }

    async fn send_command(&self, request: &CommandRequest) -> Result<ApiReply, ApiError> {
        self.command_calls.lock().unwrap().push(request.clone());
        self.commands
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| reply(200, json!({ "handled": true, "reply": "ok" })))
    }
}

pub fn channel(raw: &str) -> ChannelName {
    ChannelName::parse(raw).unwrap()
}

pub fn viewer(name: &str) -> Invoker {
    Invoker {
        id: format!("id-{name}"),
        name: name.to_string(),
        is_broadcaster: false,
        is_moderator: false,
    }
}

pub fn moderator(name: &str) -> Invoker {
    Invoker {
        is_moderator: true,
        ..viewer(name)
    }
}

pub fn message(channel_name: &str, sender: Invoker, text: &str) -> ChatMessage {
    ChatMessage {
        channel: channel(channel_name),
        sender,
        text: text.to_string(),
    }
}

/// A fully wired router over fakes.
pub struct Harness {
    pub chat: Arc<FakeChat>,
    pub api: Arc<FakeApi>,
    pub state: SharedState,
    pub trigger: SyncTrigger,
    pub forwarder: Arc<GenerationForwarder>,
    pub router: CommandRouter,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_tuning(TuningConfig::default())
    }

    pub fn with_tuning(tuning: TuningConfig) -> Self {
        let chat = Arc::new(FakeChat::default());
        let api = Arc::new(FakeApi::default());
        let state = RelayState::shared(&tuning);
        let trigger = SyncTrigger::new();
        let forwarder = Arc::new(GenerationForwarder::new(
            api.clone(),
            chat.clone(),
            state.clone(),
            Secret::new("hook-token"),
            DASHBOARD.to_string(),
        ));
        let router = CommandRouter::new(
            state.clone(),
            chat.clone(),
            api.clone(),
            forwarder.clone(),
            trigger.clone(),
            DASHBOARD.to_string(),
        );
        Self {
            chat,
            api,
            state,
            trigger,
            forwarder,
            router,
        }
    }

    pub fn synchronizer(&self, tuning: &TuningConfig) -> Arc<ChannelSynchronizer> {
        Arc::new(ChannelSynchronizer::new(
            self.chat.clone(),
            self.api.clone(),
            self.trigger.clone(),
            DASHBOARD.to_string(),
            tuning,
        ))
    }
}
