use async_trait::async_trait;
use homework_hint_bot::config::Settings;
use homework_hint_bot::content::{ContentError, ContentProvider, Task, Variant};
use homework_hint_bot::conversation::{
    keys, Authorizer, ConversationEngine, Dispatch, InMemorySessionStore, Payload, ReplyKind,
    StepTable, Value, Wizard, WizardEffects,
};
use homework_hint_bot::llm::{HintGenerator, LlmError};
use homework_hint_bot::storage::{HintType, HomeworkStore, SqliteStore};
use homework_hint_bot::tutor::TutorService;
use homework_hint_bot::views;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const ADMIN: i64 = 100;
const STUDENT: i64 = 200;
const KIM: i64 = 25;
const TASK: i64 = 7;

struct AdminOnly(i64);

impl Authorizer for AdminOnly {
    fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.0
    }
}

#[derive(Default)]
struct StaticContent {
    delay: Duration,
}

#[async_trait]
impl ContentProvider for StaticContent {
    async fn fetch_variant(&self, _kim: i64) -> Result<Variant, ContentError> {
        tokio::time::sleep(self.delay).await;
        Ok(Variant {
            description: Some("Строки".to_string()),
            tasks: vec![Task {
                task_id: TASK,
                text: "Посчитайте слова в строке".to_string(),
            }],
        })
    }
}

#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
    fail: bool,
    delay: Duration,
}

impl CountingGenerator {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    async fn answer(&self, text: &str) -> Result<String, LlmError> {
        tokio::time::sleep(self.delay).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(LlmError::ApiError("503 Service Unavailable".to_string()))
        } else {
            Ok(text.to_string())
        }
    }
}

#[async_trait]
impl HintGenerator for CountingGenerator {
    async fn generate_start_hint(
        &self,
        _task_id: i64,
        _task_description: &str,
        _reference_solution: &str,
    ) -> Result<String, LlmError> {
        self.answer("Начните с чтения строки.").await
    }

    async fn analyze_code(
        &self,
        _task_id: i64,
        _task_description: &str,
        _reference_solution: &str,
        _user_code: &str,
    ) -> Result<String, LlmError> {
        self.answer("Проверьте, как вы разбиваете строку.").await
    }
}

struct Harness {
    store: Arc<SqliteStore>,
    generator: Arc<CountingGenerator>,
    tutor: Arc<TutorService>,
    engine: ConversationEngine,
}

fn harness(generator: CountingGenerator) -> Harness {
    harness_with(
        StaticContent::default(),
        generator,
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
}

fn harness_with(
    content: StaticContent,
    generator: CountingGenerator,
    generation_timeout: Duration,
    effect_timeout: Duration,
) -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().expect("in-memory store"));
    let generator = Arc::new(generator);
    let tutor = Arc::new(TutorService::new(
        store.clone(),
        Arc::new(content),
        generator.clone(),
        generation_timeout,
    ));
    let engine = ConversationEngine::new(
        Arc::new(InMemorySessionStore::new(Duration::from_secs(60))),
        StepTable::build().expect("built-in table"),
        Arc::new(WizardEffects::new(store.clone(), tutor.clone())),
        Arc::new(AdminOnly(ADMIN)),
        effect_timeout,
    );
    Harness {
        store,
        generator,
        tutor,
        engine,
    }
}

async fn send(engine: &ConversationEngine, user_id: i64, text: &str) -> ReplyKind {
    match engine.dispatch(user_id, text).await {
        Dispatch::Reply(reply) => reply.kind,
        Dispatch::NoConversation => panic!("no open wizard for {text:?}"),
    }
}

#[tokio::test]
async fn add_solution_wizard_stores_solution_and_clears_session() {
    let h = harness(CountingGenerator::default());

    let reply = h
        .engine
        .start(ADMIN, Wizard::AddSolution, Payload::default())
        .await;
    assert_eq!(reply.kind, ReplyKind::Prompt);
    assert_eq!(send(&h.engine, ADMIN, "42").await, ReplyKind::Prompt);
    assert_eq!(send(&h.engine, ADMIN, "print(1)").await, ReplyKind::Prompt);

    let Dispatch::Reply(reply) = h.engine.dispatch(ADMIN, "-").await else {
        panic!("wizard closed too early");
    };
    assert_eq!(reply.kind, ReplyKind::Completed);
    assert!(reply.view.text.contains("Решение успешно добавлено"));

    let saved = h.store.solutions_by_task(42).await.expect("solutions");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].solution, "print(1)");
    assert_eq!(saved[0].comment, None);

    assert_eq!(
        h.engine.dispatch(ADMIN, "print(2)").await,
        Dispatch::NoConversation
    );
}

#[tokio::test]
async fn cancel_from_any_step_writes_nothing() {
    let h = harness(CountingGenerator::default());

    for answers in [vec![], vec!["42"], vec!["42", "print(1)"]] {
        h.engine
            .start(ADMIN, Wizard::AddSolution, Payload::default())
            .await;
        for answer in answers {
            send(&h.engine, ADMIN, answer).await;
        }
        assert_eq!(send(&h.engine, ADMIN, "/cancel").await, ReplyKind::Cancelled);
        assert_eq!(
            h.engine.dispatch(ADMIN, "-").await,
            Dispatch::NoConversation
        );
    }

    assert_eq!(h.store.count_solutions(42).await.expect("count"), 0);
}

#[tokio::test]
async fn validation_failure_keeps_step_and_advancing_changes_rules() {
    let h = harness(CountingGenerator::default());
    h.engine
        .start(ADMIN, Wizard::AddSolution, Payload::default())
        .await;

    assert_eq!(send(&h.engine, ADMIN, "abc").await, ReplyKind::ValidationFailed);
    assert_eq!(send(&h.engine, ADMIN, "42").await, ReplyKind::Prompt);
    // Same text again is now a solution, not a task id
    assert_eq!(send(&h.engine, ADMIN, "42").await, ReplyKind::Prompt);
    assert_eq!(send(&h.engine, ADMIN, "эталон").await, ReplyKind::Completed);

    let saved = h.store.solutions_by_task(42).await.expect("solutions");
    assert_eq!(saved[0].solution, "42");
    assert_eq!(saved[0].comment.as_deref(), Some("эталон"));
}

#[tokio::test]
async fn student_cannot_run_admin_wizard() {
    let h = harness(CountingGenerator::default());

    let reply = h
        .engine
        .start(STUDENT, Wizard::AddHomework, Payload::default())
        .await;
    assert_eq!(reply.kind, ReplyKind::Unauthorized);
    assert_eq!(
        h.engine.dispatch(STUDENT, "25").await,
        Dispatch::NoConversation
    );
}

#[tokio::test]
async fn duplicate_kim_is_rejected_on_first_step() {
    let h = harness(CountingGenerator::default());
    h.store.add_homework(KIM, None).await.expect("homework");

    h.engine
        .start(ADMIN, Wizard::AddHomework, Payload::default())
        .await;
    assert_eq!(
        send(&h.engine, ADMIN, &KIM.to_string()).await,
        ReplyKind::ValidationFailed
    );
    assert_eq!(send(&h.engine, ADMIN, "26").await, ReplyKind::Prompt);
    assert_eq!(send(&h.engine, ADMIN, "/skip").await, ReplyKind::Completed);

    let homework = h.store.get_homework(26).await.expect("get").expect("created");
    assert!(homework.is_active);
    assert_eq!(homework.title, None);
}

fn submit_seed() -> Payload {
    Payload::default()
        .with(keys::KIM, Value::Int(KIM))
        .with(keys::TASK_ID, Value::Int(TASK))
}

#[tokio::test]
async fn code_submission_records_analysis_hint() {
    let h = harness(CountingGenerator::default());
    h.store
        .add_solution(TASK, "s = input()\nprint(len(s.split()))".into(), None)
        .await
        .expect("solution");

    h.engine.start(STUDENT, Wizard::SubmitCode, submit_seed()).await;
    let Dispatch::Reply(reply) = h.engine.dispatch(STUDENT, "print(len(input()))").await else {
        panic!("wizard closed too early");
    };
    assert_eq!(reply.kind, ReplyKind::Completed);
    assert!(reply.view.text.contains("Проверьте, как вы разбиваете строку."));

    let hint = h
        .store
        .latest_hint_for_user(STUDENT)
        .await
        .expect("hints")
        .expect("recorded");
    assert_eq!(hint.hint_type, HintType::Analyze);
    assert_eq!(hint.task_id, TASK);
}

fn settings(http_timeout_secs: u64, effect_timeout_secs: u64) -> Settings {
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
        effect_timeout_secs,
        http_timeout_secs,
    }
}

#[tokio::test]
async fn slow_fetch_and_generation_fit_the_effect_timeout() {
    // Each call stays under the HTTP timeout, together they exceed it
    let settings = settings(1, 1);
    let h = harness_with(
        StaticContent {
            delay: Duration::from_millis(700),
        },
        CountingGenerator {
            delay: Duration::from_millis(700),
            ..CountingGenerator::default()
        },
        settings.http_timeout(),
        settings.effect_timeout(),
    );
    h.store
        .add_solution(TASK, "print(1)".into(), None)
        .await
        .expect("solution");

    h.engine.start(STUDENT, Wizard::SubmitCode, submit_seed()).await;
    assert_eq!(send(&h.engine, STUDENT, "print(2)").await, ReplyKind::Completed);

    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    let hint = h
        .store
        .latest_hint_for_user(STUDENT)
        .await
        .expect("hints")
        .expect("recorded");
    assert_eq!(hint.hint_type, HintType::Analyze);
}

#[tokio::test]
async fn code_analysis_failure_keeps_session_and_writes_nothing() {
    let h = harness(CountingGenerator::failing());
    h.store
        .add_solution(TASK, "print(1)".into(), None)
        .await
        .expect("solution");

    h.engine.start(STUDENT, Wizard::SubmitCode, submit_seed()).await;
    assert_eq!(send(&h.engine, STUDENT, "print(2)").await, ReplyKind::ServiceFailure);
    assert_eq!(send(&h.engine, STUDENT, "/cancel").await, ReplyKind::Cancelled);

    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    assert!(h
        .store
        .latest_hint_for_user(STUDENT)
        .await
        .expect("hints")
        .is_none());
}

#[tokio::test]
async fn start_hint_without_solutions_skips_generator() {
    let h = harness(CountingGenerator::default());

    let view = h.tutor.start_hint(STUDENT, KIM, TASK).await.expect("view");
    assert_eq!(view, views::start_checklist(KIM, TASK));
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn start_hint_generator_failure_says_try_later() {
    let h = harness(CountingGenerator::failing());
    h.store
        .add_solution(TASK, "print(1)".into(), None)
        .await
        .expect("solution");

    let view = h.tutor.start_hint(STUDENT, KIM, TASK).await.expect("view");
    assert_eq!(view, views::start_hint_unavailable(KIM, TASK));
    assert!(h
        .store
        .latest_hint_for_user(STUDENT)
        .await
        .expect("hints")
        .is_none());
}
