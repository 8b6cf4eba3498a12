//! Student-facing hint flows
//!
//! Both flows are gated on reference solutions: without one the generator is
//! never called and a static checklist is shown instead.

use crate::content::{load_variant, ContentProvider, Task};
use crate::llm::{HintGenerator, LlmError};
use crate::storage::{HintType, HomeworkStore, NewHint, ReferenceSolution, StorageError};
use crate::views::{self, UnknownSelection, View};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors of the code analysis flow
#[derive(Debug, Error)]
pub enum TutorError {
    /// The model call failed
    #[error("Hint generation failed: {0}")]
    Generation(#[from] LlmError),
    /// The model call did not finish in time
    #[error("Hint generation timed out")]
    Timeout,
    /// Reference solutions could not be read
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Start hints, code analysis and helpfulness feedback
pub struct TutorService {
    store: Arc<dyn HomeworkStore>,
    content: Arc<dyn ContentProvider>,
    generator: Arc<dyn HintGenerator>,
    generation_timeout: Duration,
}

impl TutorService {
    /// Create the service
    #[must_use]
    pub fn new(
        store: Arc<dyn HomeworkStore>,
        content: Arc<dyn ContentProvider>,
        generator: Arc<dyn HintGenerator>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            content,
            generator,
            generation_timeout,
        }
    }

    async fn find_task(&self, kim: i64, task_id: i64) -> Option<Task> {
        load_variant(self.content.as_ref(), kim)
            .await
            .and_then(|v| v.task(task_id).cloned())
    }

    /// First reference solution of the task, `None` when there is none
    async fn reference(&self, task_id: i64) -> Result<Option<ReferenceSolution>, StorageError> {
        if self.store.count_solutions(task_id).await? == 0 {
            return Ok(None);
        }
        Ok(self.store.solutions_by_task(task_id).await?.into_iter().next())
    }

    async fn record(&self, user_id: i64, task_id: i64, hint_text: &str, hint_type: HintType) {
        let hint = NewHint {
            user_id,
            task_id,
            hint_text: hint_text.to_string(),
            hint_type,
        };
        if let Err(e) = self.store.add_hint(hint).await {
            warn!(user_id, task_id, "Failed to record {hint_type} hint: {e}");
        }
    }

    async fn generate<F>(&self, call: F) -> Result<String, TutorError>
    where
        F: std::future::Future<Output = Result<String, LlmError>> + Send,
    {
        tokio::time::timeout(self.generation_timeout, call)
            .await
            .map_err(|_| TutorError::Timeout)?
            .map_err(TutorError::from)
    }

    /// "How to start" hint for a task.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSelection::TASK` if the task is not part of the variant.
    pub async fn start_hint(
        &self,
        user_id: i64,
        kim: i64,
        task_id: i64,
    ) -> Result<View, UnknownSelection> {
        let task = self
            .find_task(kim, task_id)
            .await
            .ok_or(UnknownSelection::TASK)?;

        let reference = match self.reference(task_id).await {
            Ok(reference) => reference,
            Err(e) => {
                warn!(task_id, "Failed to load reference solutions: {e}");
                return Ok(views::start_hint_unavailable(kim, task_id));
            }
        };
        let Some(ReferenceSolution { solution, .. }) = reference else {
            return Ok(views::start_checklist(kim, task_id));
        };

        let description = task.plain_text();
        match self
            .generate(
                self.generator
                    .generate_start_hint(task_id, &description, &solution),
            )
            .await
        {
            Ok(hint) => {
                info!(user_id, task_id, "Start hint generated");
                self.record(user_id, task_id, &hint, HintType::Start).await;
                Ok(views::start_hint(kim, task_id, &hint))
            }
            Err(e) => {
                warn!(user_id, task_id, "Start hint failed: {e}");
                Ok(views::start_hint_unavailable(kim, task_id))
            }
        }
    }

    /// Review of submitted code.
    ///
    /// A missing task or a task without reference solutions still yields a
    /// screen; only failures the student can retry are errors.
    ///
    /// # Errors
    ///
    /// Returns a `TutorError` if reference solutions cannot be read or the
    /// model call fails.
    pub async fn analyze_code(
        &self,
        user_id: i64,
        kim: i64,
        task_id: i64,
        code: &str,
    ) -> Result<View, TutorError> {
        let Some(task) = self.find_task(kim, task_id).await else {
            return Ok(views::code_task_missing());
        };

        let Some(reference) = self.reference(task_id).await? else {
            return Ok(views::code_checklist(kim, task_id, code.chars().count()));
        };

        let description = task.plain_text();
        let hint = self
            .generate(self.generator.analyze_code(
                task_id,
                &description,
                &reference.solution,
                code,
            ))
            .await?;

        info!(user_id, task_id, "Code analysis generated");
        self.record(user_id, task_id, &hint, HintType::Analyze).await;
        Ok(views::code_analysis(kim, task_id, &hint))
    }

    /// Store a helpfulness vote and return the alert text and next screen.
    ///
    /// Only the user's latest hint is rated, and only if it is for `task_id`.
    pub async fn feedback(
        &self,
        user_id: i64,
        kim: i64,
        task_id: i64,
        helpful: bool,
    ) -> (String, View) {
        match self.store.latest_hint_for_user(user_id).await {
            Ok(Some(hint)) if hint.task_id == task_id => {
                if let Err(e) = self.store.mark_helpful(hint.id, helpful).await {
                    warn!(user_id, hint_id = hint.id, "Failed to store feedback: {e}");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(user_id, "Failed to load latest hint: {e}"),
        }
        views::feedback_result(kim, task_id, helpful)
    }
}
