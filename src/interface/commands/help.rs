//! # Help Command
//!
//! Handles `!cuhz help`. Public, and answered before any other check.

use crate::application::utils::say_or_log;
use crate::domain::traits::ChatTransport;
use crate::domain::types::ChatMessage;
use crate::strings::{help, messages};

pub async fn handle_help(chat: &dyn ChatTransport, message: &ChatMessage, dashboard_url: &str) {
    let text = messages::addressed(&message.sender, &help::main(dashboard_url));
    say_or_log(chat, &message.channel, &text).await;
}
