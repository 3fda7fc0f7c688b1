//! # Twitch Chat Client
//!
//! Owns the WebSocket connection to Twitch chat. A background task connects,
//! authenticates, answers keep-alives and reconnects with exponential backoff;
//! the `TwitchClient` handle implements `ChatTransport` by queueing raw lines
//! for that task.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::irc::IrcMessage;
use crate::domain::config::TwitchConfig;
use crate::domain::errors::TransportError;
use crate::domain::traits::ChatTransport;
use crate::domain::types::{ChannelName, ChatMessage};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const QUIT_GRACE: Duration = Duration::from_secs(2);

type JoinWaiter = oneshot::Sender<Result<(), TransportError>>;

/// What the connection task should do after handling one inbound line.
#[derive(Debug, PartialEq, Eq)]
enum LineAction {
    Nothing,
    Send(Vec<String>),
    Reconnect,
}

/// State shared between the handle and the connection task.
struct Inner {
    username: String,
    outbound: mpsc::UnboundedSender<String>,
    connected: watch::Sender<bool>,
    pending_joins: Mutex<HashMap<ChannelName, JoinWaiter>>,
    channels: Mutex<HashSet<ChannelName>>,
    shutdown: AtomicBool,
}

#[derive(Clone)]
pub struct TwitchClient {
    inner: Arc<Inner>,
}

impl TwitchClient {
    /// Spawn the connection task. Incoming chat lines from other users arrive on
    /// the returned receiver.
    pub fn spawn(config: TwitchConfig) -> (Self, mpsc::UnboundedReceiver<ChatMessage>) {
        let (inner, outbound_rx) = Inner::new(&config.username);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(connection_loop(
            inner.clone(),
            config,
            outbound_rx,
            inbound_tx,
        ));

        (Self { inner }, inbound_rx)
    }

    /// Resolves once the server has accepted our login.
    pub async fn wait_connected(&self) -> Result<(), TransportError> {
        let mut rx = self.inner.connected.subscribe();
        rx.wait_for(|connected| *connected)
            .await
            .map(|_| ())
            .map_err(|_| TransportError::Disconnected)
    }

    /// Say goodbye to the server and stop reconnecting.
    pub async fn quit(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        if self.inner.outbound.send("QUIT".to_string()).is_err() {
            return;
        }
        let mut rx = self.inner.connected.subscribe();
        if tokio::time::timeout(QUIT_GRACE, rx.wait_for(|connected| !*connected))
            .await
            .is_err()
        {
            warn!("connection did not close within grace period");
        }
    }
}

impl Inner {
    fn new(username: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (connected, _) = watch::channel(false);
        let inner = Arc::new(Self {
            username: username.to_lowercase(),
            outbound,
            connected,
            pending_joins: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashSet::new()),
            shutdown: AtomicBool::new(false),
        });
        (inner, outbound_rx)
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    fn send_line(&self, line: String) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.outbound
            .send(line)
            .map_err(|_| TransportError::Disconnected)
    }

    async fn resolve_join(&self, channel: &ChannelName, result: Result<(), TransportError>) {
        if result.is_ok() {
            self.channels.lock().await.insert(channel.clone());
        }
        if let Some(waiter) = self.pending_joins.lock().await.remove(channel) {
            let _ = waiter.send(result);
        }
    }

    /// Mark the session as gone and fail every join still waiting on it.
    async fn session_ended(&self) {
        self.connected.send_replace(false);
        let pending: Vec<_> = self.pending_joins.lock().await.drain().collect();
        for (_, waiter) in pending {
            let _ = waiter.send(Err(TransportError::Disconnected));
        }
    }

    async fn handle_line(
        &self,
        line: &str,
        inbound: &mpsc::UnboundedSender<ChatMessage>,
    ) -> LineAction {
        let Some(msg) = IrcMessage::parse(line) else {
            return LineAction::Nothing;
        };
        let own = msg.nick().is_some_and(|nick| nick.eq_ignore_ascii_case(&self.username));

        match msg.command.as_str() {
            "PING" => {
                let token = msg.param(0).unwrap_or("tmi.twitch.tv");
                LineAction::Send(vec![format!("PONG :{token}")])
            }
            "001" => {
                info!(username = %self.username, "logged in to Twitch chat");
                self.connected.send_replace(true);
                let mut rejoin: Vec<String> = self
                    .channels
                    .lock()
                    .await
                    .iter()
                    .map(|ch| format!("JOIN {}", ch.irc()))
                    .collect();
                rejoin.sort();
                if !rejoin.is_empty() {
                    info!(count = rejoin.len(), "rejoining channels after reconnect");
                }
                LineAction::Send(rejoin)
            }
            "RECONNECT" => {
                info!("server requested reconnect");
                LineAction::Reconnect
            }
            "JOIN" if own => {
                if let Some(channel) = msg.param(0).and_then(ChannelName::parse) {
                    self.resolve_join(&channel, Ok(())).await;
                }
                LineAction::Nothing
            }
            "ROOMSTATE" => {
                if let Some(channel) = msg.param(0).and_then(ChannelName::parse) {
                    self.resolve_join(&channel, Ok(())).await;
                }
                LineAction::Nothing
            }
            "PART" if own => {
                if let Some(channel) = msg.param(0).and_then(ChannelName::parse) {
                    self.channels.lock().await.remove(&channel);
                }
                LineAction::Nothing
            }
            "NOTICE" => {
                self.handle_notice(&msg).await;
                LineAction::Nothing
            }
            "PRIVMSG" if !own => {
                let channel = msg.param(0).and_then(ChannelName::parse);
                let text = msg.param(1);
                if let (Some(channel), Some(text)) = (channel, text) {
                    let message = ChatMessage {
                        channel,
                        sender: msg.invoker(),
                        text: strip_action(text).to_string(),
                    };
                    let _ = inbound.send(message);
                }
                LineAction::Nothing
            }
            _ => LineAction::Nothing,
        }
    }

    async fn handle_notice(&self, msg: &IrcMessage) {
        let target = msg.param(0).unwrap_or("*");
        let text = msg.param(1).unwrap_or_default();

        let Some(channel) = ChannelName::parse(target).filter(|_| target != "*") else {
            // Server-level notices are how Twitch reports a bad login.
            warn!(notice = %text, "server notice");
            return;
        };
        let Some(msg_id) = msg.tag("msg-id") else {
            return;
        };

        let waiting = self.pending_joins.lock().await.contains_key(&channel);
        if waiting {
            warn!(channel = %channel, msg_id, notice = %text, "join rejected");
            let error = if msg_id.contains("rate") {
                TransportError::RateLimited(msg_id.to_string())
            } else {
                TransportError::Rejected(msg_id.to_string())
            };
            self.resolve_join(&channel, Err(error)).await;
        } else {
            debug!(channel = %channel, msg_id, notice = %text, "channel notice");
        }
    }
}

/// `/me` lines arrive wrapped in a CTCP ACTION envelope.
fn strip_action(text: &str) -> &str {
    text.strip_prefix("\u{1}ACTION ")
        .and_then(|t| t.strip_suffix('\u{1}'))
        .unwrap_or(text)
}

fn sanitize(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn login_lines(config: &TwitchConfig) -> [String; 3] {
    [
        "CAP REQ :twitch.tv/tags twitch.tv/commands".to_string(),
        format!("PASS {}", config.oauth_token.expose()),
        format!("NICK {}", config.username.to_lowercase()),
    ]
}

/// Main connection loop with auto-reconnect.
async fn connection_loop(
    inner: Arc<Inner>,
    config: TwitchConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    inbound_tx: mpsc::UnboundedSender<ChatMessage>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        info!(url = %config.irc_url, "connecting to Twitch chat");

        match connect_and_run(&inner, &config, &mut outbound_rx, &inbound_tx, &mut backoff).await {
            Ok(()) => debug!("connection closed"),
            Err(e) => error!(error = %e, "connection error"),
        }
        inner.session_ended().await;

        if inner.shutdown.load(Ordering::SeqCst) || inbound_tx.is_closed() {
            info!("chat connection stopped");
            return;
        }

        info!(delay_ms = backoff.as_millis() as u64, "reconnecting after delay");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Single connection attempt: connect, log in, then pump lines both ways.
async fn connect_and_run(
    inner: &Inner,
    config: &TwitchConfig,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    inbound_tx: &mpsc::UnboundedSender<ChatMessage>,
    backoff: &mut Duration,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (ws_stream, _response) = connect_async(config.irc_url.as_str()).await?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();

    // Anything queued for the previous session is stale.
    while outbound_rx.try_recv().is_ok() {}

    for line in login_lines(config) {
        ws_sink.send(Message::Text(line.into())).await?;
    }

    loop {
        tokio::select! {
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        for line in text.as_str().lines() {
                            match inner.handle_line(line, inbound_tx).await {
                                LineAction::Nothing => {}
                                LineAction::Send(lines) => {
                                    if inner.is_connected() {
                                        *backoff = INITIAL_BACKOFF;
                                    }
                                    for line in lines {
                                        ws_sink.send(Message::Text(line.into())).await?;
                                    }
                                }
                                LineAction::Reconnect => return Ok(()),
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket closed by server");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                }
            }
            line = outbound_rx.recv() => {
                let Some(line) = line else {
                    return Ok(());
                };
                let quitting = line == "QUIT";
                ws_sink.send(Message::Text(line.into())).await?;
                if quitting {
                    let _ = ws_sink.close().await;
                    return Ok(());
                }
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TwitchClient {
    async fn say(&self, channel: &ChannelName, text: &str) -> Result<(), TransportError> {
        self.inner
            .send_line(format!("PRIVMSG {} :{}", channel.irc(), sanitize(text)))
    }

    async fn join(&self, channel: &ChannelName) -> Result<(), TransportError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .pending_joins
            .lock()
            .await
            .insert(channel.clone(), tx);

        if let Err(e) = self.inner.send_line(format!("JOIN {}", channel.irc())) {
            self.inner.pending_joins.lock().await.remove(channel);
            return Err(e);
        }

        match tokio::time::timeout(JOIN_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Disconnected),
            Err(_) => {
                self.inner.pending_joins.lock().await.remove(channel);
                Err(TransportError::Timeout(channel.irc()))
            }
        }
    }

    async fn part(&self, channel: &ChannelName) -> Result<(), TransportError> {
        self.inner.channels.lock().await.remove(channel);
        self.inner.send_line(format!("PART {}", channel.irc()))
    }
}
