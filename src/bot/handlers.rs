//! Command and text message handlers

use super::resilient::send_view_resilient;
use crate::config::Settings;
use crate::conversation::{ConversationEngine, Dispatch};
use crate::views::{self, View};
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

/// Supported commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Main menu
    #[command(description = "main menu")]
    Start,
    /// Admin panel
    #[command(description = "admin panel")]
    Admin,
    /// Cancel the current action
    #[command(description = "cancel the current action")]
    Cancel,
}

/// Sender id of `msg`, 0 for channel posts
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Screen answering `cmd` from `user_id`, `None` if nothing should be sent.
///
/// `/start` and `/admin` drop any running wizard.
pub async fn command_reply(
    engine: &ConversationEngine,
    settings: &Settings,
    user_id: i64,
    cmd: &Command,
) -> Option<View> {
    match cmd {
        Command::Start => {
            engine.cancel(user_id).await;
            Some(views::welcome(settings.is_admin(user_id)))
        }
        Command::Admin => {
            if !settings.is_admin(user_id) {
                warn!(user_id, "Non-admin requested the admin panel");
                return Some(View::text(views::ADMIN_COMMAND_DENIED));
            }
            engine.cancel(user_id).await;
            Some(views::admin_menu())
        }
        Command::Cancel => engine.cancel(user_id).await.map(|reply| reply.view),
    }
}

/// Screen answering free text, `None` if no wizard is open
pub async fn text_reply(engine: &ConversationEngine, user_id: i64, text: &str) -> Option<View> {
    match engine.dispatch(user_id, text).await {
        Dispatch::NoConversation => None,
        Dispatch::Reply(reply) => {
            debug!(user_id, kind = ?reply.kind, "Wizard replied");
            Some(reply.view)
        }
    }
}

/// Handle a bot command.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    engine: Arc<ConversationEngine>,
    settings: Arc<Settings>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!(user_id, ?cmd, "Command received");

    if let Some(view) = command_reply(&engine, &settings, user_id, &cmd).await {
        send_view_resilient(&bot, msg.chat.id, &view).await?;
    }
    Ok(())
}

/// Handle a text message; only wizards consume free text.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_text(bot: Bot, msg: Message, engine: Arc<ConversationEngine>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let Some(text) = msg.text() else {
        return Ok(());
    };

    match text_reply(&engine, user_id, text).await {
        Some(view) => {
            send_view_resilient(&bot, msg.chat.id, &view).await?;
        }
        None => debug!(user_id, "Ignoring text outside of a wizard"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::engine::MockEffectRunner;
    use crate::conversation::{InMemorySessionStore, Payload, StepTable, Wizard};
    use std::time::Duration;

    const ADMIN: i64 = 77;

    fn settings() -> Settings {
        Settings {
            bot_token: "123:abc".into(),
            admin_id: ADMIN,
            content_api_url: String::new(),
            homework_url: String::new(),
            openrouter_api_key: None,
            llm_base_url: String::new(),
            llm_model: String::new(),
            db_path: ":memory:".into(),
            session_idle_secs: 60,
            effect_timeout_secs: 1,
            http_timeout_secs: 1,
        }
    }

    fn engine(settings: &Settings) -> ConversationEngine {
        ConversationEngine::new(
            Arc::new(InMemorySessionStore::new(Duration::from_secs(60))),
            StepTable::build().expect("valid table"),
            Arc::new(MockEffectRunner::new()),
            Arc::new(settings.clone()),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_commands_parse() {
        assert!(matches!(
            Command::parse("/start", "hint_bot"),
            Ok(Command::Start)
        ));
        assert!(matches!(
            Command::parse("/admin", "hint_bot"),
            Ok(Command::Admin)
        ));
        assert!(Command::parse("/skip", "hint_bot").is_err());
    }

    #[tokio::test]
    async fn test_admin_command_is_guarded() {
        let settings = settings();
        let engine = engine(&settings);

        let view = command_reply(&engine, &settings, 5, &Command::Admin).await;
        assert_eq!(view, Some(View::text(views::ADMIN_COMMAND_DENIED)));

        let view = command_reply(&engine, &settings, ADMIN, &Command::Admin).await;
        assert_eq!(view, Some(views::admin_menu()));
    }

    #[tokio::test]
    async fn test_start_drops_running_wizard() {
        let settings = settings();
        let engine = engine(&settings);
        engine
            .start(ADMIN, Wizard::Search, Payload::default())
            .await;

        let view = command_reply(&engine, &settings, ADMIN, &Command::Start).await;
        assert_eq!(view, Some(views::welcome(true)));
        assert_eq!(text_reply(&engine, ADMIN, "42").await, None);
    }

    #[tokio::test]
    async fn test_cancel_without_wizard_is_silent() {
        let settings = settings();
        let engine = engine(&settings);
        assert_eq!(
            command_reply(&engine, &settings, 5, &Command::Cancel).await,
            None
        );
    }

    #[tokio::test]
    async fn test_text_goes_to_open_wizard() {
        let settings = settings();
        let engine = engine(&settings);
        engine
            .start(ADMIN, Wizard::AddSolution, Payload::default())
            .await;

        let view = text_reply(&engine, ADMIN, "abc").await.expect("reply");
        assert!(view.text.contains("Неверный формат"));
    }
}
