//! # Command Router
//!
//! Routes incoming chat lines to the appropriate command handler (in `interface/commands`).
//! It classifies the line against the grammar, applies the privilege gate for mod
//! commands, and dispatches with the necessary context. Lines that are not commands
//! are ignored without a reply.

use std::sync::Arc;

use crate::application::forwarder::GenerationForwarder;
use crate::application::membership::SyncTrigger;
use crate::application::parsing::{Command, parse_command};
use crate::application::state::SharedState;
use crate::domain::traits::{ChatTransport, RelayApi};
use crate::domain::types::ChatMessage;
use crate::interface::commands;
use crate::interface::commands::admin::ToggleSetting;

pub struct CommandRouter {
    state: SharedState,
    chat: Arc<dyn ChatTransport>,
    api: Arc<dyn RelayApi>,
    forwarder: Arc<GenerationForwarder>,
    trigger: SyncTrigger,
    dashboard_url: String,
}

impl CommandRouter {
    pub fn new(
        state: SharedState,
        chat: Arc<dyn ChatTransport>,
        api: Arc<dyn RelayApi>,
        forwarder: Arc<GenerationForwarder>,
        trigger: SyncTrigger,
        dashboard_url: String,
    ) -> Self {
        Self {
            state,
            chat,
            api,
            forwarder,
            trigger,
            dashboard_url,
        }
    }

    pub async fn route(&self, message: &ChatMessage) {
        let Some(command) = parse_command(&message.text) else {
            return;
        };

        tracing::info!(
            channel = %message.channel,
            user = %message.sender.name,
            ?command,
            "router dispatching"
        );

        // Silent for non-mods so gated commands cannot be probed.
        if command.is_mod_only() && !message.sender.is_mod() {
            tracing::debug!(channel = %message.channel, user = %message.sender.name, "ignoring mod command from non-mod");
            return;
        }

        let chat = self.chat.as_ref();
        match command {
            Command::Help => {
                commands::help::handle_help(chat, message, &self.dashboard_url).await;
            }
            Command::Verify { code } => {
                commands::verify::handle_verify(
                    self.api.as_ref(),
                    chat,
                    &self.trigger,
                    message,
                    code.as_deref(),
                )
                .await;
            }
            Command::Status => {
                commands::admin::handle_status(&self.state, chat, message).await;
            }
            Command::Queue(toggle) => {
                commands::admin::handle_toggle(&self.state, chat, message, ToggleSetting::Queue, toggle)
                    .await;
            }
            Command::Safe(toggle) => {
                commands::admin::handle_toggle(&self.state, chat, message, ToggleSetting::Safe, toggle)
                    .await;
            }
            Command::Lockdown(toggle) => {
                commands::admin::handle_toggle(
                    &self.state,
                    chat,
                    message,
                    ToggleSetting::Lockdown,
                    toggle,
                )
                .await;
            }
            Command::Cooldown(secs) => {
                commands::admin::handle_cooldown(&self.state, chat, message, secs).await;
            }
            Command::Next => {
                commands::admin::handle_next(&self.state, chat, &self.forwarder, message).await;
            }
            Command::Generate { prompt } => {
                commands::generate::handle_generate(
                    &self.state,
                    chat,
                    &self.forwarder,
                    &self.dashboard_url,
                    message,
                    &prompt,
                )
                .await;
            }
        }
    }
}
