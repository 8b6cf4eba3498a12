//! Browsing screens
//!
//! Every screen is rebuilt from the ids in the pressed button; no step is
//! stored between presses. Missing entities surface as
//! [`UnknownSelection`], which the transport shows as an alert.

use crate::config::{HINT_STATS_DAYS, RECENT_HINTS_LIMIT};
use crate::content::{default_description, load_variant, ContentProvider};
use crate::storage::{HomeworkStore, StorageError};
use crate::views::{self, UnknownSelection, View};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Why a screen could not be built
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The selected entity does not exist (anymore)
    #[error(transparent)]
    Unknown(#[from] UnknownSelection),
    /// The store failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Screen plus an optional alert to pop up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// Popup text shown on top of the screen
    pub alert: Option<String>,
    /// The screen itself
    pub view: View,
}

impl From<View> for Screen {
    fn from(view: View) -> Self {
        Self { alert: None, view }
    }
}

/// Builds student and admin browsing screens
pub struct ReviewService {
    store: Arc<dyn HomeworkStore>,
    content: Arc<dyn ContentProvider>,
    homework_url: String,
}

impl ReviewService {
    /// Create the service; `homework_url` gets the KIM appended
    #[must_use]
    pub fn new(
        store: Arc<dyn HomeworkStore>,
        content: Arc<dyn ContentProvider>,
        homework_url: String,
    ) -> Self {
        Self {
            store,
            content,
            homework_url,
        }
    }

    // Student screens

    /// Active homeworks; untitled ones use the variant description
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Storage` if the homeworks cannot be read.
    pub async fn homework_list(&self) -> Result<View, ReviewError> {
        let mut entries = Vec::new();
        for hw in self.store.active_homeworks().await? {
            let title = match hw.title {
                Some(title) => title,
                None => load_variant(self.content.as_ref(), hw.kim)
                    .await
                    .map_or_else(|| default_description(hw.kim), |v| v.description_or_default(hw.kim)),
            };
            entries.push((hw.kim, title));
        }
        Ok(views::homework_list(&entries))
    }

    async fn ensure_visible(&self, kim: i64) -> Result<(), ReviewError> {
        match self.store.get_homework(kim).await? {
            Some(hw) if hw.is_active => Ok(()),
            _ => Err(UnknownSelection::HOMEWORK.into()),
        }
    }

    /// Homework card
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` for a missing or closed homework.
    pub async fn homework_detail(&self, kim: i64) -> Result<View, ReviewError> {
        self.ensure_visible(kim).await?;
        let variant = load_variant(self.content.as_ref(), kim).await.unwrap_or_default();
        Ok(views::homework_detail(
            kim,
            &variant.description_or_default(kim),
            variant.tasks.len(),
            &format!("{}{kim}", self.homework_url),
        ))
    }

    /// Task list of a homework
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if the homework is closed or its tasks
    /// cannot be loaded.
    pub async fn task_list(&self, kim: i64) -> Result<View, ReviewError> {
        self.ensure_visible(kim).await?;
        let variant = load_variant(self.content.as_ref(), kim)
            .await
            .filter(|v| !v.tasks.is_empty())
            .ok_or(UnknownSelection::TASKS_UNAVAILABLE)?;
        Ok(views::task_list(
            kim,
            &variant.description_or_default(kim),
            &variant.tasks,
        ))
    }

    /// Actions of one task
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if the task is not in the variant.
    pub async fn task_detail(&self, kim: i64, task_id: i64) -> Result<View, ReviewError> {
        load_variant(self.content.as_ref(), kim)
            .await
            .and_then(|v| v.task(task_id).map(|_| ()))
            .ok_or(UnknownSelection::TASK)?;
        Ok(views::task_detail(kim, task_id))
    }

    // Reference solutions

    /// One page of reference solutions
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Storage` if the solutions cannot be read.
    pub async fn solution_page(&self, page: i64) -> Result<View, ReviewError> {
        let solutions = self.store.list_solutions().await?;
        Ok(views::solution_list(&solutions, page))
    }

    /// Reference solution detail
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if the solution does not exist.
    pub async fn solution_detail(&self, id: i64) -> Result<View, ReviewError> {
        let solution = self
            .store
            .get_solution(id)
            .await?
            .ok_or(UnknownSelection::SOLUTION)?;
        Ok(views::solution_detail(&solution))
    }

    /// Delete confirmation for a reference solution
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if the solution does not exist.
    pub async fn solution_confirm_delete(&self, id: i64) -> Result<View, ReviewError> {
        let solution = self
            .store
            .get_solution(id)
            .await?
            .ok_or(UnknownSelection::SOLUTION)?;
        Ok(views::solution_confirm_delete(&solution))
    }

    /// Delete a reference solution
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if it was already gone.
    pub async fn delete_solution(&self, id: i64) -> Result<Screen, ReviewError> {
        if !self.store.delete_solution(id).await? {
            return Err(UnknownSelection::SOLUTION.into());
        }
        info!(solution_id = id, "Reference solution deleted");
        Ok(Screen {
            alert: Some("Решение удалено".to_string()),
            view: views::solution_deleted(),
        })
    }

    // Hints

    /// Latest hints of all students
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Storage` if the hints cannot be read.
    pub async fn recent_hints(&self) -> Result<View, ReviewError> {
        let hints = self.store.recent_hints(RECENT_HINTS_LIMIT).await?;
        Ok(views::recent_hints(&hints))
    }

    /// Hint statistics for the last week
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Storage` if the hints cannot be read.
    pub async fn hint_stats(&self) -> Result<View, ReviewError> {
        let stats = self.store.hint_stats(HINT_STATS_DAYS).await?;
        Ok(views::hint_stats(&stats))
    }

    // Homework management

    /// All homeworks with status
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Storage` if the homeworks cannot be read.
    pub async fn homework_admin_list(&self) -> Result<View, ReviewError> {
        let homeworks = self.store.list_homeworks().await?;
        Ok(views::homework_admin_list(&homeworks))
    }

    /// Homework card for the admin
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if the homework does not exist.
    pub async fn homework_admin_detail(&self, kim: i64) -> Result<View, ReviewError> {
        let homework = self
            .store
            .get_homework(kim)
            .await?
            .ok_or(UnknownSelection::HOMEWORK)?;
        Ok(views::homework_admin_detail(&homework))
    }

    /// Open or close a homework
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if the homework does not exist.
    pub async fn toggle_homework(&self, kim: i64) -> Result<Screen, ReviewError> {
        let homework = self
            .store
            .toggle_homework(kim)
            .await?
            .ok_or(UnknownSelection::HOMEWORK)?;
        info!(kim, is_active = homework.is_active, "Homework toggled");
        Ok(Screen {
            alert: Some(views::homework_toggled_alert(&homework)),
            view: views::homework_admin_detail(&homework),
        })
    }

    /// Delete confirmation for a homework
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if the homework does not exist.
    pub async fn homework_confirm_delete(&self, kim: i64) -> Result<View, ReviewError> {
        let homework = self
            .store
            .get_homework(kim)
            .await?
            .ok_or(UnknownSelection::HOMEWORK)?;
        Ok(views::homework_confirm_delete(&homework))
    }

    /// Delete a homework and go back to the list
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Unknown` if it was already gone.
    pub async fn delete_homework(&self, kim: i64) -> Result<Screen, ReviewError> {
        if !self.store.delete_homework(kim).await? {
            return Err(UnknownSelection::HOMEWORK.into());
        }
        info!(kim, "Homework deleted");
        Ok(Screen {
            alert: Some(views::HOMEWORK_DELETED_ALERT.to_string()),
            view: self.homework_admin_list().await?,
        })
    }
}
