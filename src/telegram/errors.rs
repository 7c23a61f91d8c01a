use teloxide::{ApiError, RequestError};

/// Renders a request failure for the log.
///
/// Telegram answers failed calls with an `error_code` and a description, but
/// teloxide only keeps the description (parsed into [`ApiError`]). The code is
/// recovered from the variant so API failures stay distinguishable from
/// network or decoding faults.
pub fn describe_request_error(err: &RequestError) -> String {
    match err {
        RequestError::Api(api) => format_api_error(api_error_code(api), &api.to_string()),
        RequestError::MigrateToChatId(_) => format_api_error(400, &err.to_string()),
        RequestError::RetryAfter(_) => format_api_error(429, &err.to_string()),
        other => other.to_string(),
    }
}

/// Like [`describe_request_error`], for failures that may or may not come
/// from the Bot API.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<RequestError>() {
        Some(request_err) => describe_request_error(request_err),
        None => format!("{err:#}"),
    }
}

/// Error sink for the polling loop. teloxide keeps polling afterwards.
pub(crate) fn log_transport_error(err: &RequestError) {
    tracing::error!(source = "polling", "{}", describe_request_error(err));
}

/// Error sink for failures outside the polling loop, such as a failed reply.
pub(crate) fn log_error(err: &anyhow::Error) {
    tracing::error!(source = "handler", "{}", describe_error(err));
}

fn format_api_error(code: u16, message: &str) -> String {
    format!("Telegram API Error:\n[{code}]\n{message}")
}

fn api_error_code(err: &ApiError) -> u16 {
    match err {
        ApiError::InvalidToken => 401,
        ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::UserDeactivated
        | ApiError::CantInitiateConversation
        | ApiError::CantTalkWithBots => 403,
        ApiError::TerminatedByOtherGetUpdates => 409,
        other => code_from_description(&other.to_string()),
    }
}

/// Telegram prefixes descriptions with the HTTP reason phrase of the code.
fn code_from_description(description: &str) -> u16 {
    const PREFIXES: [(&str, u16); 4] = [
        ("Unauthorized", 401),
        ("Forbidden", 403),
        ("Conflict", 409),
        ("Too Many Requests", 429),
    ];

    PREFIXES
        .iter()
        .find(|(prefix, _)| description.contains(prefix))
        .map_or(400, |(_, code)| *code)
}
