//! Inline button handling
//!
//! [`CallbackRouter`] turns a parsed [`Callback`] into a screen without
//! touching Telegram; [`handle_callback`] applies the result to the chat.

use super::resilient::{answer_callback_resilient, edit_view_safe_resilient, send_view_resilient};
use crate::callback::Callback;
use crate::conversation::{keys, Authorizer, ConversationEngine, Payload, Value, Wizard};
use crate::review::{ReviewError, ReviewService, Screen};
use crate::tutor::TutorService;
use crate::views::{self, View};
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, error, warn};

/// What to do with the pressed button's message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Replace the message, optionally popping up an alert
    Edit(Screen),
    /// Leave the message as is and pop up an alert
    Alert(String),
}

impl From<View> for Outcome {
    fn from(view: View) -> Self {
        Self::Edit(view.into())
    }
}

/// Maps buttons to services
pub struct CallbackRouter {
    engine: Arc<ConversationEngine>,
    review: Arc<ReviewService>,
    tutor: Arc<TutorService>,
    authorizer: Arc<dyn Authorizer>,
}

impl CallbackRouter {
    /// Create the router
    #[must_use]
    pub fn new(
        engine: Arc<ConversationEngine>,
        review: Arc<ReviewService>,
        tutor: Arc<TutorService>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            engine,
            review,
            tutor,
            authorizer,
        }
    }

    /// Screen for `callback` pressed by `user_id`
    pub async fn route(&self, user_id: i64, callback: Callback) -> Outcome {
        if callback.is_admin() && !self.authorizer.is_admin(user_id) {
            warn!(user_id, %callback, "Admin button pressed by non-admin");
            return Outcome::Alert(views::ADMIN_BUTTON_DENIED.to_string());
        }

        match self.screen(user_id, callback).await {
            Ok(outcome) => outcome,
            Err(ReviewError::Unknown(selection)) => {
                debug!(user_id, %callback, "Unknown selection: {selection}");
                Outcome::Alert(selection.0.to_string())
            }
            Err(ReviewError::Storage(e)) => {
                error!(user_id, %callback, "Failed to build screen: {e}");
                if callback.is_admin() {
                    views::admin_load_failed().into()
                } else {
                    Outcome::Alert(views::LOAD_FAILED_ALERT.to_string())
                }
            }
        }
    }

    async fn start_wizard(&self, user_id: i64, wizard: Wizard, seed: Payload) -> Outcome {
        self.engine.start(user_id, wizard, seed).await.view.into()
    }

    async fn screen(&self, user_id: i64, callback: Callback) -> Result<Outcome, ReviewError> {
        let review = &self.review;
        let outcome = match callback {
            Callback::MainMenu => views::main_menu().into(),
            Callback::HomeworkList => review.homework_list().await?.into(),
            Callback::Homework { kim } => review.homework_detail(kim).await?.into(),
            Callback::Hints { kim } => review.task_list(kim).await?.into(),
            Callback::Task { kim, task_id } => review.task_detail(kim, task_id).await?.into(),
            Callback::HintStart { kim, task_id } => {
                self.tutor.start_hint(user_id, kim, task_id).await?.into()
            }
            Callback::SubmitCode { kim, task_id } => {
                let seed = Payload::default()
                    .with(keys::KIM, Value::Int(kim))
                    .with(keys::TASK_ID, Value::Int(task_id));
                self.start_wizard(user_id, Wizard::SubmitCode, seed).await
            }
            Callback::Feedback {
                kim,
                task_id,
                helpful,
            } => {
                let (alert, view) = self.tutor.feedback(user_id, kim, task_id, helpful).await;
                Outcome::Edit(Screen {
                    alert: Some(alert),
                    view,
                })
            }

            Callback::AdminMenu => {
                self.engine.cancel(user_id).await;
                views::admin_menu().into()
            }
            Callback::AdminAddSolution => {
                self.start_wizard(user_id, Wizard::AddSolution, Payload::default())
                    .await
            }
            Callback::AdminListSolutions => review.solution_page(0).await?.into(),
            Callback::AdminListPage(page) => review.solution_page(page).await?.into(),
            Callback::AdminViewSolution(id) => review.solution_detail(id).await?.into(),
            Callback::AdminDelete(id) => review.solution_confirm_delete(id).await?.into(),
            Callback::AdminConfirmDelete(id) => Outcome::Edit(review.delete_solution(id).await?),
            Callback::AdminSearch => {
                self.start_wizard(user_id, Wizard::Search, Payload::default())
                    .await
            }
            Callback::AdminCancel => self
                .engine
                .cancel(user_id)
                .await
                .map_or_else(views::action_cancelled, |reply| reply.view)
                .into(),
            Callback::AdminViewHints => review.recent_hints().await?.into(),
            Callback::AdminHintStats => review.hint_stats().await?.into(),
            Callback::AdminManageHomeworks => review.homework_admin_list().await?.into(),
            Callback::AdminHwView(kim) => review.homework_admin_detail(kim).await?.into(),
            Callback::AdminHwToggle(kim) => Outcome::Edit(review.toggle_homework(kim).await?),
            Callback::AdminHwDelete(kim) => review.homework_confirm_delete(kim).await?.into(),
            Callback::AdminHwConfirmDelete(kim) => {
                Outcome::Edit(review.delete_homework(kim).await?)
            }
            Callback::AdminHwAdd => {
                self.start_wizard(user_id, Wizard::AddHomework, Payload::default())
                    .await
            }
        };
        Ok(outcome)
    }
}

/// Handle an inline button press.
///
/// # Errors
///
/// Returns an error if the new screen cannot be delivered.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, router: Arc<CallbackRouter>) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let user_id = q.from.id.0.cast_signed();

    let callback: Callback = match data.parse() {
        Ok(callback) => callback,
        Err(e) => {
            warn!(user_id, "{e}");
            answer_callback_resilient(&bot, q.id.clone(), None, false).await;
            return Ok(());
        }
    };

    match router.route(user_id, callback).await {
        Outcome::Alert(text) => {
            answer_callback_resilient(&bot, q.id.clone(), Some(&text), true).await;
        }
        Outcome::Edit(Screen { alert, view }) => {
            match q.message.as_ref() {
                Some(msg) => {
                    edit_view_safe_resilient(&bot, msg.chat().id, msg.id(), &view).await;
                }
                None => {
                    send_view_resilient(&bot, ChatId(user_id), &view).await?;
                }
            }
            answer_callback_resilient(&bot, q.id.clone(), alert.as_deref(), false).await;
        }
    }
    Ok(())
}
