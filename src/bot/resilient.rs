//! Telegram calls with automatic retry.
//!
//! Every outgoing screen goes through these wrappers, which retry transient
//! network failures with exponential backoff and jitter.

use super::keyboards::inline_markup;
use crate::config::TELEGRAM_MESSAGE_LIMIT;
use crate::views::View;
use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, ChatId, Message, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

fn fit_text(text: &str) -> String {
    crate::utils::preview(text, TELEGRAM_MESSAGE_LIMIT)
}

/// Send `view` as a new HTML message.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_view_resilient(bot: &Bot, chat_id: ChatId, view: &View) -> Result<Message> {
    let text = fit_text(&view.text);
    let markup = inline_markup(&view.keyboard);
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .send_message(chat_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }
        req.await.context("Telegram send error")
    })
    .await
}

/// Replace the message `msg_id` with `view`.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn edit_view_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    view: &View,
) -> Result<Message> {
    let text = fit_text(&view.text);
    let markup = inline_markup(&view.keyboard);
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .edit_message_text(chat_id, msg_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }
        req.await.context("Telegram edit error")
    })
    .await
}

/// True for edits Telegram rejects because nothing needs to change
fn is_stale_edit(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RequestError>(),
        Some(RequestError::Api(
            ApiError::MessageNotModified | ApiError::MessageToEditNotFound
        ))
    )
}

/// Edit with graceful degradation.
///
/// "Not modified" and "not found" are expected when a user presses the same
/// button twice or the message was deleted; both are logged at debug level.
///
/// Returns `true` if the message was edited.
pub async fn edit_view_safe_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    view: &View,
) -> bool {
    match edit_view_resilient(bot, chat_id, msg_id, view).await {
        Ok(_) => true,
        Err(e) => {
            if is_stale_edit(&e) {
                debug!("Message update skipped: {e:#}");
            } else {
                warn!("Failed to edit message: {e:#}");
            }
            false
        }
    }
}

/// Answer a callback query, optionally with a toast or a popup alert.
///
/// Failures are logged; the button spinner simply times out on the client.
pub async fn answer_callback_resilient(
    bot: &Bot,
    query_id: CallbackQueryId,
    text: Option<&str>,
    show_alert: bool,
) {
    let result = crate::utils::retry_telegram_operation(|| async {
        let mut req = bot.answer_callback_query(query_id.clone());
        if let Some(text) = text {
            req = req.text(text).show_alert(show_alert);
        }
        req.await.context("Telegram answer error")
    })
    .await;
    if let Err(e) = result {
        warn!("Failed to answer callback query: {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_edit_detection() {
        let not_modified = anyhow::Error::new(RequestError::Api(ApiError::MessageNotModified))
            .context("Telegram edit error");
        assert!(is_stale_edit(&not_modified));

        let blocked = anyhow::Error::new(RequestError::Api(ApiError::BotBlocked))
            .context("Telegram edit error");
        assert!(!is_stale_edit(&blocked));
        assert!(!is_stale_edit(&anyhow::anyhow!("message is not modified")));
    }
}
