use teloxide::requests::Requester;
use teloxide::types::BotCommand;
use teloxide::{Bot, RequestError};

/// Publishes the command menu shown by Telegram clients.
pub(super) async fn register_bot_commands(bot: &Bot) -> Result<(), RequestError> {
    bot.set_my_commands(supported_commands()).await?;
    Ok(())
}

fn supported_commands() -> Vec<BotCommand> {
    vec![BotCommand::new("start", "Open the Web App")]
}
