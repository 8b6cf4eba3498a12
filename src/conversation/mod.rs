//! Multi-step conversations
//!
//! A wizard is a fixed chain of steps. The engine keeps one session per
//! user, validates each message against the current step and runs the
//! step's side effect before moving on.

/// Side effects of the built-in wizards
pub mod effects;
/// Dispatch of user input to steps
pub mod engine;
/// Per-user session storage
pub mod session;
/// Wizards, steps and payload
pub mod step;
/// Step definitions
pub mod table;

pub use effects::WizardEffects;
pub use engine::{
    is_cancel, Authorizer, ConversationEngine, Dispatch, EffectError, EffectRunner, Reply,
    ReplyKind,
};
pub use session::{InMemorySessionStore, Session, SessionStore};
pub use step::{keys, Payload, Step, Value, Wizard};
pub use table::{Effect, StepTable};

use thiserror::Error;

/// Inconsistent step table or wizard state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No definition for a step
    #[error("No definition for step {0}")]
    UndefinedStep(Step),
    /// Two definitions for the same step
    #[error("Step {0} is defined twice")]
    DuplicateStep(Step),
    /// A transition leaves its wizard
    #[error("Transition into step {0} crosses wizards")]
    CrossesWizard(Step),
    /// A wizard revisits a step
    #[error("Step {0} is reached twice")]
    Cycle(Step),
    /// A step reads a key nobody wrote
    #[error("Step {step} needs payload key `{key}`")]
    MissingKey {
        /// Reading step
        step: Step,
        /// Missing key
        key: &'static str,
    },
    /// A wizard was started without a required seed key
    #[error("Wizard {wizard:?} started without `{key}`")]
    MissingSeed {
        /// Started wizard
        wizard: Wizard,
        /// Missing key
        key: &'static str,
    },
    /// Validator and transition disagree on the input shape
    #[error("Step {0} got input of the wrong shape")]
    UnexpectedInput(Step),
}
