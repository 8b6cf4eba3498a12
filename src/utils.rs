//! Utility functions for text processing and Telegram API retries.

use anyhow::Result;
use std::time::Duration;
use teloxide::RequestError;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use homework_hint_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Truncates to `max_chars` and appends `...` if anything was cut.
///
/// # Examples
///
/// ```
/// use homework_hint_bot::utils::preview;
/// assert_eq!(preview("abcdef", 3), "abc...");
/// assert_eq!(preview("abc", 3), "abc");
/// ```
#[must_use]
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", truncate_str(s, max_chars))
    } else {
        s.to_string()
    }
}

/// Escapes user-provided text for Telegram HTML parse mode.
///
/// # Examples
///
/// ```
/// use homework_hint_bot::utils::escape_html;
/// assert_eq!(escape_html("a < b && c"), "a &lt; b &amp;&amp; c");
/// ```
#[must_use]
pub fn escape_html(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

/// Delay requested by Telegram flood control, if `err` carries one
fn retry_after(err: &anyhow::Error) -> Option<Duration> {
    match err.downcast_ref::<RequestError>() {
        Some(RequestError::RetryAfter(secs)) => Some(secs.duration()),
        _ => None,
    }
}

/// True unless `err` is a Telegram error that a repeated call cannot fix
fn is_transient(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<RequestError>() {
        Some(RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)) => true,
        Some(_) => false,
        None => true,
    }
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Network failures are retried with jitter. A `RetryAfter` answer waits
/// the requested delay before the next attempt. API errors such as "message
/// is not modified" are returned at once.
///
/// # Errors
///
/// Returns the first permanent error, or the error of the last attempt.
pub async fn retry_telegram_operation<F, Fut, T>(mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    let attempt = move || {
        let call = operation();
        async move {
            let result = call.await;
            if let Some(delay) = result.as_ref().err().and_then(retry_after) {
                warn!("Telegram flood control, waiting {delay:?}");
                tokio::time::sleep(delay).await;
            }
            result
        }
    };

    RetryIf::spawn(retry_strategy, attempt, is_transient)
        .await
        .map_err(|e| {
            if is_transient(&e) {
                warn!(
                    "Telegram API operation failed after {} retries: {e:#}",
                    TELEGRAM_API_MAX_RETRIES
                );
            } else {
                debug!("Telegram API rejected the request: {e:#}");
            }
            e
        })
}
