//! Wizards, their steps and the data collected along the way

use std::collections::BTreeMap;
use std::fmt;

/// Payload keys
pub mod keys {
    /// Task id of a reference solution or a submission
    pub const TASK_ID: &str = "task_id";
    /// Reference solution text
    pub const SOLUTION: &str = "solution";
    /// Optional reference solution comment
    pub const COMMENT: &str = "comment";
    /// Homework variant id
    pub const KIM: &str = "kim";
    /// Optional homework title
    pub const TITLE: &str = "title";
}

/// A multi-step dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Wizard {
    /// Admin adds a reference solution
    AddSolution,
    /// Admin registers a homework variant
    AddHomework,
    /// Admin looks up reference solutions of a task
    Search,
    /// Student sends code for review
    SubmitCode,
}

impl Wizard {
    /// Every wizard
    pub const ALL: [Self; 4] = [
        Self::AddSolution,
        Self::AddHomework,
        Self::Search,
        Self::SubmitCode,
    ];

    /// Only the administrator may run this wizard
    #[must_use]
    pub const fn admin_only(self) -> bool {
        !matches!(self, Self::SubmitCode)
    }

    /// Step the wizard starts at
    #[must_use]
    pub const fn first_step(self) -> Step {
        match self {
            Self::AddSolution => Step::AddSolutionTaskId,
            Self::AddHomework => Step::AddHomeworkKim,
            Self::Search => Step::SearchTaskId,
            Self::SubmitCode => Step::SubmitCode,
        }
    }

    /// Payload keys the caller must provide when starting the wizard
    #[must_use]
    pub const fn seed_keys(self) -> &'static [&'static str] {
        match self {
            Self::SubmitCode => &[keys::KIM, keys::TASK_ID],
            Self::AddSolution | Self::AddHomework | Self::Search => &[],
        }
    }
}

/// Position inside a wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// Waiting for the task id of a new reference solution
    AddSolutionTaskId,
    /// Waiting for the solution code
    AddSolutionText,
    /// Waiting for a comment or `-`
    AddSolutionComment,
    /// Waiting for the KIM of a new homework
    AddHomeworkKim,
    /// Waiting for a title or `/skip`
    AddHomeworkTitle,
    /// Waiting for the task id to search for
    SearchTaskId,
    /// Waiting for the student's code
    SubmitCode,
}

impl Step {
    /// Every step
    pub const ALL: [Self; 7] = [
        Self::AddSolutionTaskId,
        Self::AddSolutionText,
        Self::AddSolutionComment,
        Self::AddHomeworkKim,
        Self::AddHomeworkTitle,
        Self::SearchTaskId,
        Self::SubmitCode,
    ];

    /// Wizard this step belongs to
    #[must_use]
    pub const fn wizard(self) -> Wizard {
        match self {
            Self::AddSolutionTaskId | Self::AddSolutionText | Self::AddSolutionComment => {
                Wizard::AddSolution
            }
            Self::AddHomeworkKim | Self::AddHomeworkTitle => Wizard::AddHomework,
            Self::SearchTaskId => Wizard::Search,
            Self::SubmitCode => Wizard::SubmitCode,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A payload entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Integer id
    Int(i64),
    /// Free text
    Text(String),
    /// Optional field the user skipped
    Empty,
}

/// Data accumulated by a wizard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(BTreeMap<&'static str, Value>);

impl Payload {
    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: &'static str, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing a previous value
    pub fn insert(&mut self, key: &'static str, value: Value) {
        self.0.insert(key, value);
    }

    /// True if `key` is present, skipped values included
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Integer stored under `key`
    #[must_use]
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Text stored under `key`; `None` for missing or skipped values
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing was collected yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_step_belongs_to_its_wizard() {
        for wizard in Wizard::ALL {
            assert_eq!(wizard.first_step().wizard(), wizard);
        }
    }

    #[test]
    fn test_payload_accessors() {
        let payload = Payload::default()
            .with(keys::TASK_ID, Value::Int(42))
            .with(keys::SOLUTION, Value::Text("print(1)".into()))
            .with(keys::COMMENT, Value::Empty);

        assert_eq!(payload.int(keys::TASK_ID), Some(42));
        assert_eq!(payload.text(keys::SOLUTION), Some("print(1)"));
        assert_eq!(payload.text(keys::COMMENT), None);
        assert!(payload.contains(keys::COMMENT));
        assert_eq!(payload.int(keys::SOLUTION), None);
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn test_only_submit_code_is_open_to_students() {
        let open: Vec<_> = Wizard::ALL.into_iter().filter(|w| !w.admin_only()).collect();
        assert_eq!(open, vec![Wizard::SubmitCode]);
    }
}
