//! Side effects of the built-in wizards

use super::engine::{EffectError, EffectRunner};
use super::table::Effect;
use crate::storage::{HomeworkStore, StorageError};
use crate::tutor::TutorService;
use crate::views::{self, View};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

const KIM_EXISTS: &str = "❌ Домашняя работа с таким KIM уже существует!";

fn storage_failure(e: &StorageError) -> EffectError {
    warn!("Wizard storage call failed: {e}");
    EffectError::Service(views::service_unavailable())
}

/// [`EffectRunner`] backed by the store and the tutor service
pub struct WizardEffects {
    store: Arc<dyn HomeworkStore>,
    tutor: Arc<TutorService>,
}

impl WizardEffects {
    /// Create the runner
    #[must_use]
    pub fn new(store: Arc<dyn HomeworkStore>, tutor: Arc<TutorService>) -> Self {
        Self { store, tutor }
    }
}

#[async_trait]
impl EffectRunner for WizardEffects {
    async fn run(&self, user_id: i64, effect: Effect) -> Result<Option<View>, EffectError> {
        match effect {
            Effect::EnsureKimFree { kim } => {
                match self.store.get_homework(kim).await {
                    Ok(Some(_)) => Err(EffectError::Rejected(KIM_EXISTS.to_string())),
                    Ok(None) => Ok(None),
                    Err(e) => Err(storage_failure(&e)),
                }
            }
            Effect::CreateSolution {
                task_id,
                solution,
                comment,
            } => {
                let saved = self
                    .store
                    .add_solution(task_id, solution, comment)
                    .await
                    .map_err(|e| storage_failure(&e))?;
                info!(solution_id = saved.id, task_id, "Reference solution added");
                Ok(Some(views::solution_added(&saved)))
            }
            Effect::CreateHomework { kim, title } => {
                match self.store.add_homework(kim, title).await {
                    Ok(homework) => {
                        info!(kim, "Homework added");
                        Ok(Some(views::homework_added(&homework)))
                    }
                    Err(StorageError::DuplicateKim(_)) => {
                        Err(EffectError::Rejected(KIM_EXISTS.to_string()))
                    }
                    Err(e) => Err(storage_failure(&e)),
                }
            }
            Effect::SearchSolutions { task_id } => {
                let solutions = self
                    .store
                    .solutions_by_task(task_id)
                    .await
                    .map_err(|e| storage_failure(&e))?;
                Ok(Some(views::search_results(task_id, &solutions)))
            }
            Effect::AnalyzeCode { kim, task_id, code } => self
                .tutor
                .analyze_code(user_id, kim, task_id, &code)
                .await
                .map(Some)
                .map_err(|e| {
                    warn!(user_id, task_id, "Code analysis failed: {e}");
                    EffectError::Service(views::code_analysis_failed())
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MockContentProvider;
    use crate::llm::MockHintGenerator;
    use crate::storage::{Homework, MockHomeworkStore};
    use chrono::Utc;
    use std::time::Duration;

    fn runner(store: MockHomeworkStore) -> WizardEffects {
        let store: Arc<dyn HomeworkStore> = Arc::new(store);
        let tutor = TutorService::new(
            store.clone(),
            Arc::new(MockContentProvider::new()),
            Arc::new(MockHintGenerator::new()),
            Duration::from_secs(1),
        );
        WizardEffects::new(store, Arc::new(tutor))
    }

    fn homework(kim: i64) -> Homework {
        Homework {
            id: 1,
            kim,
            title: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_existing_kim_is_rejected() {
        let mut store = MockHomeworkStore::new();
        store
            .expect_get_homework()
            .returning(|kim| Ok(Some(homework(kim))));

        let result = runner(store).run(1, Effect::EnsureKimFree { kim: 25 }).await;
        assert_eq!(result, Err(EffectError::Rejected(KIM_EXISTS.to_string())));
    }

    #[tokio::test]
    async fn test_duplicate_on_insert_is_rejected() {
        let mut store = MockHomeworkStore::new();
        store
            .expect_add_homework()
            .returning(|kim, _| Err(StorageError::DuplicateKim(kim)));

        let result = runner(store)
            .run(
                1,
                Effect::CreateHomework {
                    kim: 25,
                    title: None,
                },
            )
            .await;
        assert!(matches!(result, Err(EffectError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_storage_failure_is_service_error() {
        let mut store = MockHomeworkStore::new();
        store
            .expect_solutions_by_task()
            .returning(|_| Err(StorageError::Poisoned));

        let result = runner(store)
            .run(1, Effect::SearchSolutions { task_id: 3 })
            .await;
        assert_eq!(
            result,
            Err(EffectError::Service(views::service_unavailable()))
        );
    }
}
