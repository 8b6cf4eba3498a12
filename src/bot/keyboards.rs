//! Conversion of [`View`] keyboards into Telegram markup

use crate::views::{ButtonAction, Keyboard};
use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::warn;

fn to_button(label: &str, action: &ButtonAction) -> Option<InlineKeyboardButton> {
    match action {
        ButtonAction::Callback(callback) => Some(InlineKeyboardButton::callback(
            label.to_string(),
            callback.to_string(),
        )),
        ButtonAction::Url(url) => match Url::parse(url) {
            Ok(url) => Some(InlineKeyboardButton::url(label.to_string(), url)),
            Err(e) => {
                warn!("Dropping button {label:?} with invalid URL {url:?}: {e}");
                None
            }
        },
    }
}

/// Inline markup for `keyboard`; `None` when it has no buttons
#[must_use]
pub fn inline_markup(keyboard: &Keyboard) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|b| to_button(&b.label, &b.action))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Callback;
    use crate::views::{self, Button};
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn test_empty_keyboard_has_no_markup() {
        assert!(inline_markup(&Vec::new()).is_none());
        assert!(inline_markup(&views::access_denied().keyboard).is_none());
    }

    #[test]
    fn test_buttons_keep_rows_and_tokens() {
        let keyboard = vec![
            vec![
                Button::callback("1", Callback::Task { kim: 5, task_id: 1 }),
                Button::callback("2", Callback::Task { kim: 5, task_id: 2 }),
            ],
            vec![Button::url("Open", "https://kompege.ru/homework?kim=5")],
        ];
        let markup = inline_markup(&keyboard).expect("markup");
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert!(matches!(
            &markup.inline_keyboard[0][1].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "task_5_2"
        ));
        assert!(matches!(
            &markup.inline_keyboard[1][0].kind,
            InlineKeyboardButtonKind::Url(_)
        ));
    }

    #[test]
    fn test_invalid_url_row_is_dropped() {
        let keyboard = vec![
            vec![Button::url("Broken", "not a url")],
            vec![Button::callback("Back", Callback::MainMenu)],
        ];
        let markup = inline_markup(&keyboard).expect("markup");
        assert_eq!(markup.inline_keyboard.len(), 1);
    }
}
