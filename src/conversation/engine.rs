//! Conversation engine
//!
//! Routes each incoming message of a user with an open wizard to the
//! definition of their current step. The order inside one dispatch is
//! fixed: authorization, cancel, validation, side effect, session write.

use super::session::{Session, SessionStore};
use super::step::{Payload, Step, Wizard};
use super::table::{Effect, StepTable};
use super::EngineError;
use crate::callback::Callback;
use crate::config::Settings;
use crate::views::{self, Keyboard, View};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Text command that cancels any wizard
pub const CANCEL_COMMAND: &str = "/cancel";

/// True if `input` cancels the running wizard
#[must_use]
pub fn is_cancel(input: &str) -> bool {
    let input = input.trim();
    input == CANCEL_COMMAND || input == Callback::AdminCancel.to_string()
}

/// Decides who may run admin-only wizards
#[cfg_attr(test, mockall::automock)]
pub trait Authorizer: Send + Sync {
    /// True if `user_id` is an administrator
    fn is_admin(&self, user_id: i64) -> bool;
}

impl Authorizer for Settings {
    fn is_admin(&self, user_id: i64) -> bool {
        Self::is_admin(self, user_id)
    }
}

/// Failure of a side effect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    /// Input is well-formed but not acceptable; the user should retry
    #[error("Rejected: {0}")]
    Rejected(String),
    /// A collaborator failed; the message is shown to the user
    #[error("Service failure: {0}")]
    Service(String),
}

/// Executes the side effects requested by steps
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EffectRunner: Send + Sync {
    /// Run `effect` for `user_id`; `Some(view)` replaces the default reply
    async fn run(&self, user_id: i64, effect: Effect) -> Result<Option<View>, EffectError>;
}

/// Kind of an engine reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Prompt of the next (or first) step
    Prompt,
    /// Input rejected, same step again
    ValidationFailed,
    /// Wizard finished
    Completed,
    /// Wizard cancelled
    Cancelled,
    /// A collaborator failed, same step again
    ServiceFailure,
    /// User may not run this wizard
    Unauthorized,
    /// Broken step table or payload; session dropped
    InternalError,
}

/// Reply of the engine to one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply kind
    pub kind: ReplyKind,
    /// Screen to show
    pub view: View,
}

impl Reply {
    fn new(kind: ReplyKind, view: View) -> Self {
        Self { kind, view }
    }
}

/// Outcome of [`ConversationEngine::dispatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The user has no open wizard; handle the input elsewhere
    NoConversation,
    /// The engine consumed the input
    Reply(Reply),
}

fn wizard_keyboard(wizard: Wizard) -> Keyboard {
    if wizard.admin_only() {
        views::cancel_keyboard()
    } else {
        Vec::new()
    }
}

fn cancelled_view(wizard: Wizard) -> View {
    match wizard {
        Wizard::SubmitCode => views::code_submission_cancelled(),
        Wizard::AddSolution | Wizard::AddHomework | Wizard::Search => views::action_cancelled(),
    }
}

/// Multi-step dialogue engine shared by all wizards
pub struct ConversationEngine {
    sessions: Arc<dyn SessionStore>,
    table: StepTable,
    effects: Arc<dyn EffectRunner>,
    authorizer: Arc<dyn Authorizer>,
    effect_timeout: Duration,
}

impl ConversationEngine {
    /// Create an engine
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        table: StepTable,
        effects: Arc<dyn EffectRunner>,
        authorizer: Arc<dyn Authorizer>,
        effect_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            table,
            effects,
            authorizer,
            effect_timeout,
        }
    }

    fn allowed(&self, user_id: i64, wizard: Wizard) -> bool {
        !wizard.admin_only() || self.authorizer.is_admin(user_id)
    }

    async fn deny(&self, user_id: i64, wizard: Wizard) -> Reply {
        warn!(user_id, ?wizard, "Denied access to admin wizard");
        self.sessions.clear(user_id).await;
        Reply::new(ReplyKind::Unauthorized, views::access_denied())
    }

    async fn internal_error(&self, user_id: i64, err: &EngineError) -> Reply {
        error!(user_id, "Conversation invariant violated: {err}");
        self.sessions.clear(user_id).await;
        Reply::new(ReplyKind::InternalError, views::internal_error())
    }

    fn prompt(&self, step: Step, payload: &Payload) -> Result<View, EngineError> {
        let def = self.table.get(step).ok_or(EngineError::UndefinedStep(step))?;
        Ok(View::new((def.prompt)(payload), wizard_keyboard(step.wizard())))
    }

    /// Open `wizard` for `user_id`, replacing any running one.
    ///
    /// `seed` must carry the wizard's seed keys (e.g. KIM and task id for
    /// code submission).
    pub async fn start(&self, user_id: i64, wizard: Wizard, seed: Payload) -> Reply {
        if !self.allowed(user_id, wizard) {
            return self.deny(user_id, wizard).await;
        }
        if let Some(key) = wizard.seed_keys().iter().copied().find(|k| !seed.contains(k)) {
            let err = EngineError::MissingSeed { wizard, key };
            return self.internal_error(user_id, &err).await;
        }

        let step = wizard.first_step();
        match self.prompt(step, &seed) {
            Ok(view) => {
                info!(user_id, ?wizard, "Wizard started");
                self.sessions
                    .set(
                        user_id,
                        Session {
                            step,
                            payload: seed,
                        },
                    )
                    .await;
                Reply::new(ReplyKind::Prompt, view)
            }
            Err(e) => self.internal_error(user_id, &e).await,
        }
    }

    /// Drop the wizard of `user_id`; `None` if there was none
    pub async fn cancel(&self, user_id: i64) -> Option<Reply> {
        let session = self.sessions.get(user_id).await?;
        self.sessions.clear(user_id).await;
        let wizard = session.step.wizard();
        info!(user_id, ?wizard, "Wizard cancelled");
        Some(Reply::new(ReplyKind::Cancelled, cancelled_view(wizard)))
    }

    /// Feed one message of `user_id` to their open wizard
    pub async fn dispatch(&self, user_id: i64, input: &str) -> Dispatch {
        let Some(session) = self.sessions.get(user_id).await else {
            return Dispatch::NoConversation;
        };
        Dispatch::Reply(self.advance(user_id, session, input).await)
    }

    async fn advance(&self, user_id: i64, session: Session, input: &str) -> Reply {
        let Session { step, payload } = session;
        let wizard = step.wizard();

        if !self.allowed(user_id, wizard) {
            return self.deny(user_id, wizard).await;
        }

        if is_cancel(input) {
            self.sessions.clear(user_id).await;
            info!(user_id, ?wizard, "Wizard cancelled");
            return Reply::new(ReplyKind::Cancelled, cancelled_view(wizard));
        }

        let Some(def) = self.table.get(step) else {
            return self
                .internal_error(user_id, &EngineError::UndefinedStep(step))
                .await;
        };

        let validated = match (def.validate)(input) {
            Ok(v) => v,
            Err(e) => {
                debug!(user_id, %step, "Validation failed: {e}");
                return Reply::new(
                    ReplyKind::ValidationFailed,
                    View::new(def.invalid_prompt, wizard_keyboard(wizard)),
                );
            }
        };

        let advance = match (def.on_success)(step, &payload, validated) {
            Ok(a) => a,
            Err(e) => return self.internal_error(user_id, &e).await,
        };

        let mut outcome = None;
        if let Some(effect) = advance.effect {
            match tokio::time::timeout(self.effect_timeout, self.effects.run(user_id, effect)).await
            {
                Ok(Ok(view)) => outcome = view,
                Ok(Err(EffectError::Rejected(msg))) => {
                    debug!(user_id, %step, "Effect rejected input: {msg}");
                    return Reply::new(
                        ReplyKind::ValidationFailed,
                        View::new(msg, wizard_keyboard(wizard)),
                    );
                }
                Ok(Err(EffectError::Service(msg))) => {
                    warn!(user_id, %step, "Effect failed: {msg}");
                    return Reply::new(
                        ReplyKind::ServiceFailure,
                        View::new(msg, wizard_keyboard(wizard)),
                    );
                }
                Err(_) => {
                    warn!(user_id, %step, "Effect timed out after {:?}", self.effect_timeout);
                    return Reply::new(
                        ReplyKind::ServiceFailure,
                        View::new(views::service_unavailable(), wizard_keyboard(wizard)),
                    );
                }
            }
        }

        match def.next {
            None => {
                self.sessions.clear(user_id).await;
                info!(user_id, ?wizard, "Wizard completed");
                Reply::new(
                    ReplyKind::Completed,
                    outcome.unwrap_or_else(views::wizard_done),
                )
            }
            Some(next) => match self.prompt(next, &advance.payload) {
                Ok(view) => {
                    self.sessions
                        .set(
                            user_id,
                            Session {
                                step: next,
                                payload: advance.payload,
                            },
                        )
                        .await;
                    Reply::new(ReplyKind::Prompt, view)
                }
                Err(e) => self.internal_error(user_id, &e).await,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::session::{InMemorySessionStore, MockSessionStore};
    use crate::conversation::step::{keys, Value};

    const ADMIN: i64 = 1;
    const STUDENT: i64 = 2;

    fn authorizer() -> Arc<dyn Authorizer> {
        let mut auth = MockAuthorizer::new();
        auth.expect_is_admin().returning(|id| id == ADMIN);
        Arc::new(auth)
    }

    fn engine_with(sessions: Arc<dyn SessionStore>, effects: MockEffectRunner) -> ConversationEngine {
        ConversationEngine::new(
            sessions,
            StepTable::build().expect("built-in table"),
            Arc::new(effects),
            authorizer(),
            Duration::from_millis(200),
        )
    }

    fn engine(effects: MockEffectRunner) -> (ConversationEngine, Arc<InMemorySessionStore>) {
        let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(60)));
        (engine_with(sessions.clone(), effects), sessions)
    }

    fn no_effects() -> MockEffectRunner {
        let mut effects = MockEffectRunner::new();
        effects.expect_run().never();
        effects
    }

    fn reply(dispatch: Dispatch) -> Reply {
        match dispatch {
            Dispatch::Reply(r) => r,
            Dispatch::NoConversation => panic!("expected a reply"),
        }
    }

    #[tokio::test]
    async fn test_no_session_touches_nothing() {
        let mut sessions = MockSessionStore::new();
        sessions.expect_get().returning(|_| None);
        sessions.expect_set().never();
        sessions.expect_clear().never();

        let engine = engine_with(Arc::new(sessions), no_effects());
        assert_eq!(engine.dispatch(STUDENT, "42").await, Dispatch::NoConversation);
    }

    #[tokio::test]
    async fn test_cancel_from_any_step() {
        let (engine, sessions) = engine(no_effects());

        engine.start(ADMIN, Wizard::AddSolution, Payload::default()).await;
        reply(engine.dispatch(ADMIN, "42").await);
        reply(engine.dispatch(ADMIN, "print(1)").await);

        let r = reply(engine.dispatch(ADMIN, " /cancel ").await);
        assert_eq!(r.kind, ReplyKind::Cancelled);
        assert!(sessions.get(ADMIN).await.is_none());

        engine.start(ADMIN, Wizard::Search, Payload::default()).await;
        let r = reply(engine.dispatch(ADMIN, "admin_cancel").await);
        assert_eq!(r.kind, ReplyKind::Cancelled);
        assert_eq!(r.view, views::action_cancelled());
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_session() {
        let (engine, sessions) = engine(no_effects());
        engine.start(ADMIN, Wizard::AddSolution, Payload::default()).await;
        let before = sessions.get(ADMIN).await;

        let r = reply(engine.dispatch(ADMIN, "forty two").await);
        assert_eq!(r.kind, ReplyKind::ValidationFailed);
        assert!(r.view.text.contains("числовой Task ID"));
        assert_eq!(sessions.get(ADMIN).await, before);
    }

    #[tokio::test]
    async fn test_same_input_is_validated_by_new_step() {
        let (engine, sessions) = engine(no_effects());
        engine.start(ADMIN, Wizard::AddSolution, Payload::default()).await;

        let r = reply(engine.dispatch(ADMIN, "42").await);
        assert_eq!(r.kind, ReplyKind::Prompt);
        // "42" is a valid solution text as well
        let r = reply(engine.dispatch(ADMIN, "42").await);
        assert_eq!(r.kind, ReplyKind::Prompt);

        let session = sessions.get(ADMIN).await.expect("session");
        assert_eq!(session.step, Step::AddSolutionComment);
        assert_eq!(session.payload.text(keys::SOLUTION), Some("42"));
    }

    #[tokio::test]
    async fn test_student_cannot_start_admin_wizard() {
        let (engine, sessions) = engine(no_effects());
        let r = engine.start(STUDENT, Wizard::AddHomework, Payload::default()).await;
        assert_eq!(r.kind, ReplyKind::Unauthorized);
        assert!(sessions.get(STUDENT).await.is_none());
    }

    #[tokio::test]
    async fn test_authorization_checked_on_every_dispatch() {
        let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(60)));
        sessions
            .set(
                STUDENT,
                Session {
                    step: Step::SearchTaskId,
                    payload: Payload::default(),
                },
            )
            .await;
        let engine = engine_with(sessions.clone(), no_effects());

        let r = reply(engine.dispatch(STUDENT, "42").await);
        assert_eq!(r.kind, ReplyKind::Unauthorized);
        assert!(sessions.get(STUDENT).await.is_none());
    }

    #[tokio::test]
    async fn test_submit_code_requires_seed() {
        let (engine, sessions) = engine(no_effects());
        let r = engine
            .start(STUDENT, Wizard::SubmitCode, Payload::default().with(keys::KIM, Value::Int(1)))
            .await;
        assert_eq!(r.kind, ReplyKind::InternalError);
        assert!(sessions.get(STUDENT).await.is_none());
    }

    #[tokio::test]
    async fn test_service_failure_keeps_step() {
        let mut effects = MockEffectRunner::new();
        effects
            .expect_run()
            .times(1)
            .returning(|_, _| Err(EffectError::Service("down".into())));
        let (engine, sessions) = engine(effects);

        let seed = Payload::default()
            .with(keys::KIM, Value::Int(5))
            .with(keys::TASK_ID, Value::Int(7));
        engine.start(STUDENT, Wizard::SubmitCode, seed).await;

        let r = reply(engine.dispatch(STUDENT, "print(1)").await);
        assert_eq!(r.kind, ReplyKind::ServiceFailure);
        assert_eq!(r.view.text, "down");
        assert_eq!(
            sessions.get(STUDENT).await.map(|s| s.step),
            Some(Step::SubmitCode)
        );
    }

    #[tokio::test]
    async fn test_rejected_kim_keeps_step() {
        let mut effects = MockEffectRunner::new();
        effects
            .expect_run()
            .withf(|_, effect| *effect == Effect::EnsureKimFree { kim: 25 })
            .times(1)
            .returning(|_, _| Err(EffectError::Rejected("exists".into())));
        let (engine, sessions) = engine(effects);

        engine.start(ADMIN, Wizard::AddHomework, Payload::default()).await;
        let r = reply(engine.dispatch(ADMIN, "25").await);
        assert_eq!(r.kind, ReplyKind::ValidationFailed);
        assert_eq!(
            sessions.get(ADMIN).await.map(|s| s.step),
            Some(Step::AddHomeworkKim)
        );
    }

    struct SlowEffects;

    #[async_trait]
    impl EffectRunner for SlowEffects {
        async fn run(&self, _user_id: i64, _effect: Effect) -> Result<Option<View>, EffectError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_effect_timeout_is_service_failure() {
        let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(60)));
        let engine = ConversationEngine::new(
            sessions.clone(),
            StepTable::build().expect("built-in table"),
            Arc::new(SlowEffects),
            authorizer(),
            Duration::from_millis(50),
        );

        engine.start(ADMIN, Wizard::Search, Payload::default()).await;
        let r = reply(engine.dispatch(ADMIN, "42").await);
        assert_eq!(r.kind, ReplyKind::ServiceFailure);
        assert!(sessions.get(ADMIN).await.is_some());
    }

    #[tokio::test]
    async fn test_cancel_without_session() {
        let (engine, _) = engine(no_effects());
        assert!(engine.cancel(ADMIN).await.is_none());

        engine.start(ADMIN, Wizard::Search, Payload::default()).await;
        let r = engine.cancel(ADMIN).await.expect("cancelled");
        assert_eq!(r.kind, ReplyKind::Cancelled);
    }
}
