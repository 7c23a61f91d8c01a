use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use teloxide::RequestError;
use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, Me, UpdateKind, WebAppInfo};
use teloxide::update_listeners;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{AppConfig, TelegramBotConfig};
use crate::reply::{InboundUpdate, OutboundReply, WebAppButton, reply_for};
use commands::register_bot_commands;
use errors::{log_error, log_transport_error};

mod commands;
pub mod errors;

const SHUTDOWN_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Settings shared with every update handler through the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSettings {
    pub web_app_url: String,
}

/// Long-polling update listener.
///
/// Owns the teloxide client and answers `/start` with a Web App button. The
/// receive loop itself is driven by teloxide; this type only wires handlers,
/// error sinks and cancellation.
#[derive(Clone)]
pub struct TelegramRuntime {
    bot: Bot,
    settings: Arc<ListenerSettings>,
}

impl TelegramRuntime {
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::from_telegram_config(&config.telegram_bot)
    }

    pub fn from_telegram_config(config: &TelegramBotConfig) -> Result<Self> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(anyhow!("telegram_bot.token must be set"));
        }

        Ok(Self {
            bot: Bot::new(token.to_owned()),
            settings: Arc::new(ListenerSettings {
                web_app_url: config.web_app_url.trim().to_owned(),
            }),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &ListenerSettings {
        &self.settings
    }

    /// Checks Telegram reachability and token validity via `getMe`.
    pub async fn verify_connection(&self) -> Result<Me> {
        self.bot
            .get_me()
            .send()
            .await
            .context("failed to call Telegram getMe")
    }

    /// Polls for updates until `shutdown` is cancelled.
    ///
    /// Failures are logged and never end the loop; reconnecting is left to
    /// teloxide's polling. If Telegram cannot be reached at startup the
    /// failure is logged and `run` returns.
    pub async fn run(self, shutdown: CancellationToken) {
        if shutdown.is_cancelled() {
            tracing::info!("shutdown requested before telegram listener started");
            return;
        }

        let handler = dptree::entry().endpoint(handle_update);
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.settings.clone()])
            .error_handler(Arc::new(|err: anyhow::Error| async move {
                log_error(&err);
            }))
            .build();

        let forwarder = forward_shutdown(shutdown, dispatcher.shutdown_token());

        self.announce().await;

        let listener = update_listeners::polling_default(self.bot.clone()).await;
        tracing::info!("telegram listener started");
        let dispatched = dispatcher
            .try_dispatch_with_listener(
                listener,
                Arc::new(|err: RequestError| async move {
                    log_transport_error(&err);
                }),
            )
            .await;

        forwarder.abort();
        match dispatched {
            Ok(()) => tracing::info!("telegram listener stopped"),
            // The dispatcher needs `getMe` before it can start polling.
            Err(err) => {
                log_transport_error(&err);
                tracing::warn!("telegram listener could not start");
            }
        }
    }

    async fn announce(&self) {
        match self.verify_connection().await {
            Ok(me) => tracing::info!(
                username = me.user.username.as_deref().unwrap_or_default(),
                "connected to Telegram"
            ),
            Err(err) => log_error(&err),
        }

        if let Err(err) = register_bot_commands(&self.bot).await {
            log_transport_error(&err);
        }

        if self.settings.web_app_url.is_empty() {
            tracing::warn!(
                "telegram_bot.web_app_url is not configured; /start replies will carry an empty URL"
            );
        }
    }
}

/// Outbound side of the listener.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, reply: OutboundReply) -> Result<()>;
}

#[async_trait]
impl ReplySender for Bot {
    async fn send_reply(&self, reply: OutboundReply) -> Result<()> {
        let chat_id = reply.chat_id;
        let mut request = self.send_message(ChatId(chat_id), reply.text);
        if let Some(button) = &reply.button {
            request = request.reply_markup(web_app_keyboard(button)?);
        }

        request
            .await
            .with_context(|| format!("failed to send web app button to chat {chat_id}"))?;
        Ok(())
    }
}

impl From<&Update> for InboundUpdate {
    fn from(update: &Update) -> Self {
        match &update.kind {
            UpdateKind::Message(msg) => Self::Message {
                chat_id: msg.chat.id.0,
                text: msg.text().map(str::to_owned),
            },
            _ => Self::Other,
        }
    }
}

/// Sends the reply for `update`, if any. Returns without calling `sender`
/// for every update other than a `/start` message.
pub async fn respond_to_update<S>(
    sender: &S,
    update: &InboundUpdate,
    web_app_url: &str,
) -> Result<()>
where
    S: ReplySender + ?Sized,
{
    let Some(reply) = reply_for(update, web_app_url) else {
        return Ok(());
    };

    tracing::debug!(chat_id = reply.chat_id, "sending web app button");
    sender.send_reply(reply).await
}

async fn handle_update(bot: Bot, update: Update, settings: Arc<ListenerSettings>) -> Result<()> {
    let inbound = InboundUpdate::from(&update);
    respond_to_update(&bot, &inbound, &settings.web_app_url).await
}

fn web_app_keyboard(button: &WebAppButton) -> Result<InlineKeyboardMarkup> {
    let url = Url::parse(&button.url)
        .with_context(|| format!("invalid web app url {:?}", button.url))?;

    Ok(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::web_app(button.label.clone(), WebAppInfo { url }),
    ]]))
}

fn forward_shutdown(shutdown: CancellationToken, dispatcher: ShutdownToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown.cancelled().await;
        tracing::info!("shutdown requested, stopping telegram listener");

        loop {
            match dispatcher.shutdown() {
                Ok(stopped) => {
                    stopped.await;
                    return;
                }
                // Dispatcher is still idle while polling is being set up.
                Err(_) => tokio::time::sleep(SHUTDOWN_RETRY_INTERVAL).await,
            }
        }
    })
}
