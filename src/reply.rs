//! Command matching and reply construction, independent of the Telegram client.

pub const START_COMMAND: &str = "/start";
pub const WEB_APP_PROMPT: &str = "Click the button below to open the Web App:";
pub const WEB_APP_BUTTON_LABEL: &str = "Open Web App";

/// The parts of an inbound update this bot looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUpdate {
    Message { chat_id: i64, text: Option<String> },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub chat_id: i64,
    pub text: String,
    pub button: Option<WebAppButton>,
}

impl OutboundReply {
    #[must_use]
    pub fn web_app_launch(chat_id: i64, web_app_url: &str) -> Self {
        Self {
            chat_id,
            text: WEB_APP_PROMPT.to_string(),
            button: Some(WebAppButton {
                label: WEB_APP_BUTTON_LABEL.to_string(),
                url: web_app_url.to_string(),
            }),
        }
    }
}

/// Returns the reply for `update`, or `None` when the update is not a `/start`
/// message.
#[must_use]
pub fn reply_for(update: &InboundUpdate, web_app_url: &str) -> Option<OutboundReply> {
    let InboundUpdate::Message { chat_id, text } = update else {
        return None;
    };

    let text = text.as_deref()?;
    if !is_start_command(text) {
        return None;
    }

    Some(OutboundReply::web_app_launch(*chat_id, web_app_url))
}

/// Exact match after lowercasing; `/start payload` and `/start@bot` do not count.
fn is_start_command(text: &str) -> bool {
    text.to_lowercase() == START_COMMAND
}
