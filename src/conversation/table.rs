//! Step definitions of all wizards
//!
//! The table is built once at startup and checked for completeness: every
//! step has a definition, transitions stay inside their wizard, and each
//! step only reads payload keys written by the seed or an earlier step.

use super::step::{keys, Payload, Step, Value, Wizard};
use super::EngineError;
use crate::views;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Input accepted by a validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// Parsed integer
    Int(i64),
    /// Non-empty text
    Text(String),
    /// The user skipped an optional field
    Skip,
}

/// Why a validator rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Expected a whole number
    #[error("not an integer")]
    NotAnInteger,
    /// Blank input
    #[error("empty input")]
    Empty,
}

/// Side effect requested by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Reject the KIM if a homework with it already exists
    EnsureKimFree {
        /// Variant id
        kim: i64,
    },
    /// Store a reference solution
    CreateSolution {
        /// Task id
        task_id: i64,
        /// Solution code
        solution: String,
        /// Optional comment
        comment: Option<String>,
    },
    /// Store an active homework
    CreateHomework {
        /// Variant id
        kim: i64,
        /// Optional title
        title: Option<String>,
    },
    /// List reference solutions of a task
    SearchSolutions {
        /// Task id
        task_id: i64,
    },
    /// Review a student's code
    AnalyzeCode {
        /// Variant id
        kim: i64,
        /// Task id
        task_id: i64,
        /// Submitted code
        code: String,
    },
}

/// Result of a successful step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// Payload after the step
    pub payload: Payload,
    /// Effect to run before moving on
    pub effect: Option<Effect>,
}

/// Input validator of a step
pub type Validator = fn(&str) -> Result<Validated, ValidationError>;
/// Transition of a step, run after validation
pub type OnSuccess = fn(Step, &Payload, Validated) -> Result<Advance, EngineError>;

/// Contract of one step
#[derive(Debug, Clone, Copy)]
pub struct StepDefinition {
    /// Step this definition handles
    pub step: Step,
    /// Prompt shown when the step becomes current
    pub prompt: fn(&Payload) -> String,
    /// Prompt shown after invalid input
    pub invalid_prompt: &'static str,
    /// Input validator
    pub validate: Validator,
    /// Payload keys this step reads
    pub requires: &'static [&'static str],
    /// Payload keys this step writes
    pub produces: &'static [&'static str],
    /// Builds the new payload and the effect
    pub on_success: OnSuccess,
    /// Following step, `None` when the wizard ends here
    pub next: Option<Step>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validators
// ─────────────────────────────────────────────────────────────────────────────

fn integer(raw: &str) -> Result<Validated, ValidationError> {
    raw.trim()
        .parse()
        .map(Validated::Int)
        .map_err(|_| ValidationError::NotAnInteger)
}

fn non_empty(raw: &str) -> Result<Validated, ValidationError> {
    if raw.trim().is_empty() {
        Err(ValidationError::Empty)
    } else {
        Ok(Validated::Text(raw.to_string()))
    }
}

fn skippable(raw: &str, skip_tokens: &[&str]) -> Result<Validated, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty)
    } else if skip_tokens.contains(&trimmed) {
        Ok(Validated::Skip)
    } else {
        Ok(Validated::Text(trimmed.to_string()))
    }
}

fn comment(raw: &str) -> Result<Validated, ValidationError> {
    skippable(raw, &["-"])
}

fn title(raw: &str) -> Result<Validated, ValidationError> {
    skippable(raw, &["/skip", "-"])
}

// ─────────────────────────────────────────────────────────────────────────────
// Transitions
// ─────────────────────────────────────────────────────────────────────────────

fn want_int(step: Step, input: Validated) -> Result<i64, EngineError> {
    match input {
        Validated::Int(v) => Ok(v),
        _ => Err(EngineError::UnexpectedInput(step)),
    }
}

fn want_text(step: Step, input: Validated) -> Result<String, EngineError> {
    match input {
        Validated::Text(v) => Ok(v),
        _ => Err(EngineError::UnexpectedInput(step)),
    }
}

fn optional(step: Step, input: Validated) -> Result<Option<String>, EngineError> {
    match input {
        Validated::Text(v) => Ok(Some(v)),
        Validated::Skip => Ok(None),
        Validated::Int(_) => Err(EngineError::UnexpectedInput(step)),
    }
}

fn read_int(step: Step, payload: &Payload, key: &'static str) -> Result<i64, EngineError> {
    payload
        .int(key)
        .ok_or(EngineError::MissingKey { step, key })
}

fn read_text(step: Step, payload: &Payload, key: &'static str) -> Result<String, EngineError> {
    payload
        .text(key)
        .map(ToString::to_string)
        .ok_or(EngineError::MissingKey { step, key })
}

fn solution_task_id(step: Step, payload: &Payload, input: Validated) -> Result<Advance, EngineError> {
    let task_id = want_int(step, input)?;
    Ok(Advance {
        payload: payload.clone().with(keys::TASK_ID, Value::Int(task_id)),
        effect: None,
    })
}

fn solution_text(step: Step, payload: &Payload, input: Validated) -> Result<Advance, EngineError> {
    let text = want_text(step, input)?;
    Ok(Advance {
        payload: payload.clone().with(keys::SOLUTION, Value::Text(text)),
        effect: None,
    })
}

fn solution_comment(
    step: Step,
    payload: &Payload,
    input: Validated,
) -> Result<Advance, EngineError> {
    let comment = optional(step, input)?;
    let effect = Effect::CreateSolution {
        task_id: read_int(step, payload, keys::TASK_ID)?,
        solution: read_text(step, payload, keys::SOLUTION)?,
        comment: comment.clone(),
    };
    Ok(Advance {
        payload: payload
            .clone()
            .with(keys::COMMENT, comment.map_or(Value::Empty, Value::Text)),
        effect: Some(effect),
    })
}

fn homework_kim(step: Step, payload: &Payload, input: Validated) -> Result<Advance, EngineError> {
    let kim = want_int(step, input)?;
    Ok(Advance {
        payload: payload.clone().with(keys::KIM, Value::Int(kim)),
        effect: Some(Effect::EnsureKimFree { kim }),
    })
}

fn homework_title(step: Step, payload: &Payload, input: Validated) -> Result<Advance, EngineError> {
    let title = optional(step, input)?;
    let effect = Effect::CreateHomework {
        kim: read_int(step, payload, keys::KIM)?,
        title: title.clone(),
    };
    Ok(Advance {
        payload: payload
            .clone()
            .with(keys::TITLE, title.map_or(Value::Empty, Value::Text)),
        effect: Some(effect),
    })
}

fn search_task_id(step: Step, payload: &Payload, input: Validated) -> Result<Advance, EngineError> {
    let task_id = want_int(step, input)?;
    Ok(Advance {
        payload: payload.clone().with(keys::TASK_ID, Value::Int(task_id)),
        effect: Some(Effect::SearchSolutions { task_id }),
    })
}

fn submit_code(step: Step, payload: &Payload, input: Validated) -> Result<Advance, EngineError> {
    let code = want_text(step, input)?;
    Ok(Advance {
        payload: payload.clone(),
        effect: Some(Effect::AnalyzeCode {
            kim: read_int(step, payload, keys::KIM)?,
            task_id: read_int(step, payload, keys::TASK_ID)?,
            code,
        }),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompts
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_solution_task_id(_: &Payload) -> String {
    "➕ <b>Добавление решения</b>\n\nШаг 1/3: Введите Task ID задачи:".to_string()
}

fn prompt_solution_text(payload: &Payload) -> String {
    let task_id = payload.int(keys::TASK_ID).unwrap_or_default();
    format!("✅ Task ID: <code>{task_id}</code>\n\nШаг 2/3: Отправьте текст решения (код):")
}

fn prompt_solution_comment(payload: &Payload) -> String {
    let len = payload
        .text(keys::SOLUTION)
        .map_or(0, |s| s.chars().count());
    format!(
        "✅ Решение получено ({len} символов)\n\n\
         Шаг 3/3: Введите комментарий к решению\nили отправьте '-' для пропуска:"
    )
}

fn prompt_homework_kim(_: &Payload) -> String {
    "➕ <b>Добавление домашней работы</b>\n\nВведите KIM (ID варианта):".to_string()
}

fn prompt_homework_title(_: &Payload) -> String {
    "Введите название работы (или отправьте /skip для пропуска):".to_string()
}

fn prompt_search(_: &Payload) -> String {
    "🔍 <b>Поиск решений</b>\n\nВведите Task ID для поиска:".to_string()
}

fn prompt_submit_code(_: &Payload) -> String {
    views::submit_code_prompt()
}

/// Definitions of every step, in declaration order
#[must_use]
pub fn default_definitions() -> Vec<StepDefinition> {
    vec![
        StepDefinition {
            step: Step::AddSolutionTaskId,
            prompt: prompt_solution_task_id,
            invalid_prompt: "❌ Неверный формат. Введите числовой Task ID:",
            validate: integer,
            requires: &[],
            produces: &[keys::TASK_ID],
            on_success: solution_task_id,
            next: Some(Step::AddSolutionText),
        },
        StepDefinition {
            step: Step::AddSolutionText,
            prompt: prompt_solution_text,
            invalid_prompt: "❌ Решение не может быть пустым. Отправьте текст решения (код):",
            validate: non_empty,
            requires: &[keys::TASK_ID],
            produces: &[keys::SOLUTION],
            on_success: solution_text,
            next: Some(Step::AddSolutionComment),
        },
        StepDefinition {
            step: Step::AddSolutionComment,
            prompt: prompt_solution_comment,
            invalid_prompt: "❌ Введите комментарий или отправьте '-' для пропуска:",
            validate: comment,
            requires: &[keys::TASK_ID, keys::SOLUTION],
            produces: &[keys::COMMENT],
            on_success: solution_comment,
            next: None,
        },
        StepDefinition {
            step: Step::AddHomeworkKim,
            prompt: prompt_homework_kim,
            invalid_prompt: "❌ Неверный формат. Введите числовой KIM:",
            validate: integer,
            requires: &[],
            produces: &[keys::KIM],
            on_success: homework_kim,
            next: Some(Step::AddHomeworkTitle),
        },
        StepDefinition {
            step: Step::AddHomeworkTitle,
            prompt: prompt_homework_title,
            invalid_prompt: "❌ Введите название или отправьте /skip для пропуска:",
            validate: title,
            requires: &[keys::KIM],
            produces: &[keys::TITLE],
            on_success: homework_title,
            next: None,
        },
        StepDefinition {
            step: Step::SearchTaskId,
            prompt: prompt_search,
            invalid_prompt: "❌ Неверный формат. Введите числовой Task ID:",
            validate: integer,
            requires: &[],
            produces: &[keys::TASK_ID],
            on_success: search_task_id,
            next: None,
        },
        StepDefinition {
            step: Step::SubmitCode,
            prompt: prompt_submit_code,
            invalid_prompt: "❌ Отправьте код текстом или /cancel для отмены.",
            validate: non_empty,
            requires: &[keys::KIM, keys::TASK_ID],
            produces: &[],
            on_success: submit_code,
            next: None,
        },
    ]
}

/// Immutable, validated step table
#[derive(Debug)]
pub struct StepTable {
    steps: BTreeMap<Step, StepDefinition>,
}

impl StepTable {
    /// Table of all built-in wizards
    ///
    /// # Errors
    ///
    /// Returns an `EngineError` if the built-in definitions are inconsistent.
    pub fn build() -> Result<Self, EngineError> {
        Self::from_definitions(default_definitions())
    }

    /// Validate `definitions` and build a table from them
    ///
    /// # Errors
    ///
    /// Returns an `EngineError` describing the first inconsistency found.
    pub fn from_definitions(definitions: Vec<StepDefinition>) -> Result<Self, EngineError> {
        let mut steps = BTreeMap::new();
        for def in definitions {
            if steps.insert(def.step, def).is_some() {
                return Err(EngineError::DuplicateStep(def.step));
            }
        }

        for step in Step::ALL {
            if !steps.contains_key(&step) {
                return Err(EngineError::UndefinedStep(step));
            }
        }

        for wizard in Wizard::ALL {
            Self::check_chain(&steps, wizard)?;
        }

        Ok(Self { steps })
    }

    fn check_chain(
        steps: &BTreeMap<Step, StepDefinition>,
        wizard: Wizard,
    ) -> Result<(), EngineError> {
        let mut available: BTreeSet<&str> = wizard.seed_keys().iter().copied().collect();
        let mut visited = BTreeSet::new();
        let mut current = Some(wizard.first_step());

        while let Some(step) = current {
            if step.wizard() != wizard {
                return Err(EngineError::CrossesWizard(step));
            }
            if !visited.insert(step) {
                return Err(EngineError::Cycle(step));
            }
            let def = steps.get(&step).ok_or(EngineError::UndefinedStep(step))?;
            if let Some(key) = def.requires.iter().copied().find(|k| !available.contains(k)) {
                return Err(EngineError::MissingKey { step, key });
            }
            available.extend(def.produces.iter().copied());
            current = def.next;
        }
        Ok(())
    }

    /// Definition of `step`
    #[must_use]
    pub fn get(&self, step: Step) -> Option<&StepDefinition> {
        self.steps.get(&step)
    }
}
