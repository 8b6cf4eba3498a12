//! Screens of the bot
//!
//! Texts (Telegram HTML) and keyboards for every screen. Nothing here does
//! I/O: callers fetch the data and pass it in, the transport turns a
//! [`View`] into a Telegram message.

use crate::callback::Callback;
use crate::config::{PAGE_SIZE, TELEGRAM_MESSAGE_LIMIT};
use crate::content::Task;
use crate::storage::{Hint, HintStats, HintType, Homework, ReferenceSolution};
use crate::utils::{escape_html, preview, truncate_str};
use chrono::{DateTime, Utc};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Building blocks
// ─────────────────────────────────────────────────────────────────────────────

/// What pressing a button does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Sends a selection token back to the bot
    Callback(Callback),
    /// Opens a link
    Url(String),
}

/// One inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Visible label
    pub label: String,
    /// Action on press
    pub action: ButtonAction,
}

impl Button {
    /// Button that sends `callback`
    pub fn callback(label: impl Into<String>, callback: Callback) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(callback),
        }
    }

    /// Button that opens `url`
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Rows of inline buttons
pub type Keyboard = Vec<Vec<Button>>;

/// A rendered screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Message text in Telegram HTML
    pub text: String,
    /// Inline keyboard, may be empty
    pub keyboard: Keyboard,
}

impl View {
    /// Screen with a keyboard
    pub fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    /// Screen without buttons
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Callback tokens of all buttons, row by row
    #[must_use]
    pub fn callbacks(&self) -> Vec<Callback> {
        self.keyboard
            .iter()
            .flatten()
            .filter_map(|b| match b.action {
                ButtonAction::Callback(c) => Some(c),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }
}

/// A selection token referring to an entity that no longer exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct UnknownSelection(pub &'static str);

impl UnknownSelection {
    /// Reference solution is gone
    pub const SOLUTION: Self = Self("❌ Решение не найдено");
    /// Homework is gone
    pub const HOMEWORK: Self = Self("❌ Домашняя работа не найдена");
    /// Task is not part of the variant
    pub const TASK: Self = Self("❌ Задание не найдено");
    /// Variant could not be loaded
    pub const TASKS_UNAVAILABLE: Self = Self("❌ Не удалось загрузить задания");
}

fn one_per_row(buttons: Vec<Button>) -> Keyboard {
    buttons.into_iter().map(|b| vec![b]).collect()
}

fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%d.%m.%Y %H:%M").to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Pagination
// ─────────────────────────────────────────────────────────────────────────────

/// Visible slice of a paginated list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based page index after clamping
    pub index: usize,
    /// Number of pages, at least 1
    pub pages: usize,
    /// First visible item
    pub start: usize,
    /// One past the last visible item
    pub end: usize,
}

impl PageWindow {
    /// True if a previous page exists
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.index > 0
    }

    /// True if a next page exists
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.index + 1 < self.pages
    }
}

/// Clamps `requested` into the pages of a list of `len` items.
///
/// Negative pages map to the first page, pages past the end to the last one.
/// Returns `None` for an empty list.
///
/// # Examples
///
/// ```
/// use homework_hint_bot::views::clamp_page;
///
/// assert_eq!(clamp_page(-1, 12, 5).map(|w| w.index), Some(0));
/// assert_eq!(clamp_page(9, 12, 5).map(|w| (w.index, w.start, w.end)), Some((2, 10, 12)));
/// assert!(clamp_page(0, 0, 5).is_none());
/// ```
#[must_use]
pub fn clamp_page(requested: i64, len: usize, page_size: usize) -> Option<PageWindow> {
    if len == 0 || page_size == 0 {
        return None;
    }
    let pages = len.div_ceil(page_size);
    let last = pages - 1;
    let index = usize::try_from(requested.max(0)).map_or(last, |p| p.min(last));
    let start = index * page_size;
    Some(PageWindow {
        index,
        pages,
        start,
        end: (start + page_size).min(len),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Student screens
// ─────────────────────────────────────────────────────────────────────────────

const WELCOME: &str = "👋 Добро пожаловать!\n\nЯ помогу вам с домашними заданиями по информатике.\n";

const START_CHECKLIST: &str = "💡 <b>Подсказка для начала:</b>\n\n\
    1. Внимательно прочитайте условие задачи\n\
    2. Определите входные и выходные данные\n\
    3. Продумайте алгоритм решения\n\
    4. Начните с простого примера\n\
    5. Напишите код пошагово\n\n\
    Если нужна помощь с кодом - отправьте его для проверки!";

fn main_menu_keyboard() -> Keyboard {
    vec![vec![Button::callback(
        "📚 Домашняя работа",
        Callback::HomeworkList,
    )]]
}

/// Greeting shown on `/start`
#[must_use]
pub fn welcome(is_admin: bool) -> View {
    let mut text = WELCOME.to_string();
    if is_admin {
        text.push_str("\n🔧 Вы - администратор. Используйте /admin для управления решениями.\n");
    }
    text.push_str("\nВыберите действие:");
    View::new(text, main_menu_keyboard())
}

/// Main menu reached through the "back" buttons
#[must_use]
pub fn main_menu() -> View {
    View::new(format!("{WELCOME}Выберите действие:"), main_menu_keyboard())
}

/// Active homeworks as `(kim, title)` pairs
#[must_use]
pub fn homework_list(homeworks: &[(i64, String)]) -> View {
    if homeworks.is_empty() {
        return View::new("❌ Нет доступных домашних работ", main_menu_keyboard());
    }

    let mut buttons: Vec<Button> = homeworks
        .iter()
        .map(|(kim, title)| {
            Button::callback(format!("{title} | КИМ: {kim}"), Callback::Homework { kim: *kim })
        })
        .collect();
    buttons.push(Button::callback("◀️ Назад", Callback::MainMenu));
    View::new("📚 Доступные домашние работы:", one_per_row(buttons))
}

/// Homework card with the link to its public page
#[must_use]
pub fn homework_detail(kim: i64, description: &str, task_count: usize, link: &str) -> View {
    let text = format!(
        "📚 <b>{}</b>\n\n🆔 КИМ: <code>{kim}</code>\n📝 Количество заданий: {task_count}\n\nВыберите действие:",
        escape_html(description)
    );
    let buttons = vec![
        Button::url("🔗 Открыть работу", link),
        Button::callback("💡 Получить подсказку по заданиям", Callback::Hints { kim }),
        Button::callback("◀️ Назад к списку", Callback::HomeworkList),
    ];
    View::new(text, one_per_row(buttons))
}

/// Tasks of a variant, two per row
#[must_use]
pub fn task_list(kim: i64, description: &str, tasks: &[Task]) -> View {
    let text = format!(
        "💡 Подсказки для: <b>{}</b>\n\nВыберите задание:",
        escape_html(description)
    );
    let task_buttons: Vec<Button> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            Button::callback(
                format!("Задание #{} (ID: {})", idx + 1, task.task_id),
                Callback::Task {
                    kim,
                    task_id: task.task_id,
                },
            )
        })
        .collect();

    let mut keyboard: Keyboard = task_buttons.chunks(2).map(<[Button]>::to_vec).collect();
    keyboard.push(vec![Button::callback(
        "◀️ Назад к работе",
        Callback::Homework { kim },
    )]);
    View::new(text, keyboard)
}

fn task_actions_keyboard(kim: i64, task_id: i64) -> Keyboard {
    one_per_row(vec![
        Button::callback("💡 Как начать?", Callback::HintStart { kim, task_id }),
        Button::callback(
            "📝 Отправить код для проверки",
            Callback::SubmitCode { kim, task_id },
        ),
        Button::callback("◀️ Назад к заданиям", Callback::Hints { kim }),
    ])
}

fn feedback_keyboard(kim: i64, task_id: i64) -> Keyboard {
    vec![
        vec![
            Button::callback(
                "✅ Помогла",
                Callback::Feedback {
                    kim,
                    task_id,
                    helpful: true,
                },
            ),
            Button::callback(
                "❌ Не помогла",
                Callback::Feedback {
                    kim,
                    task_id,
                    helpful: false,
                },
            ),
        ],
        vec![Button::callback(
            "◀️ Назад к заданию",
            Callback::Task { kim, task_id },
        )],
    ]
}

/// Actions for one task
#[must_use]
pub fn task_detail(kim: i64, task_id: i64) -> View {
    View::new(
        format!("📋 <b>Задание #{task_id}</b>\n\nВыберите действие:"),
        task_actions_keyboard(kim, task_id),
    )
}

/// Generated start hint with the feedback buttons
#[must_use]
pub fn start_hint(kim: i64, task_id: i64, hint: &str) -> View {
    View::new(
        format!(
            "💡 <b>Подсказка для начала:</b>\n\n{}",
            escape_html(hint)
        ),
        feedback_keyboard(kim, task_id),
    )
}

/// Generic checklist used when the task has no reference solution
#[must_use]
pub fn start_checklist(kim: i64, task_id: i64) -> View {
    View::new(START_CHECKLIST, task_actions_keyboard(kim, task_id))
}

/// Generator failed; apology followed by the generic checklist
#[must_use]
pub fn start_hint_unavailable(kim: i64, task_id: i64) -> View {
    View::new(
        format!("❌ Не удалось сгенерировать подсказку. Попробуйте позже.\n\n{START_CHECKLIST}"),
        task_actions_keyboard(kim, task_id),
    )
}

/// Prompt of the code submission wizard
#[must_use]
pub fn submit_code_prompt() -> String {
    "📝 <b>Отправка кода</b>\n\n\
     Отправьте ваш код следующим сообщением.\n\
     Я проанализирую его и дам подсказки.\n\n\
     Для отмены отправьте /cancel"
        .to_string()
}

/// Generic review used when the task has no reference solution
#[must_use]
pub fn code_checklist(kim: i64, task_id: i64, code_len: usize) -> View {
    View::new(
        format!(
            "✅ <b>Код получен!</b>\n\n\
             📊 Длина кода: {code_len} символов\n\n\
             💡 <b>Базовые рекомендации:</b>\n\
             1. Проверьте граничные случаи\n\
             2. Убедитесь в правильности типов данных\n\
             3. Оптимизируйте сложные участки кода\n\
             4. Добавьте обработку ошибок\n\n\
             Продолжайте работу над заданием!"
        ),
        task_actions_keyboard(kim, task_id),
    )
}

/// Model feedback on submitted code
#[must_use]
pub fn code_analysis(kim: i64, task_id: i64, hint: &str) -> View {
    View::new(
        format!(
            "🔍 <b>Анализ кода:</b>\n\n{}\n\nПопробуйте исправить код и отправьте снова!",
            escape_html(hint)
        ),
        feedback_keyboard(kim, task_id),
    )
}

/// Analysis failed; the student may resend the code
#[must_use]
pub fn code_analysis_failed() -> String {
    "❌ Не удалось проанализировать код. Попробуйте позже.\n\n\
     Отправьте код ещё раз или /cancel для отмены."
        .to_string()
}

/// Submitted code refers to a task that is not in the variant
#[must_use]
pub fn code_task_missing() -> View {
    View::new("❌ Задача не найдена", main_menu_keyboard())
}

/// Alert text and follow-up screen after a helpfulness vote
#[must_use]
pub fn feedback_result(kim: i64, task_id: i64, helpful: bool) -> (String, View) {
    if helpful {
        (
            "✅ Отлично! Продолжайте в том же духе!".to_string(),
            View::new(
                format!(
                    "📋 <b>Задание #{task_id}</b>\n\nРады, что подсказка помогла!\n\nВыберите действие:"
                ),
                task_actions_keyboard(kim, task_id),
            ),
        )
    } else {
        (
            "Попробуйте отправить свой код для проверки - мы постараемся помочь точнее!"
                .to_string(),
            View::new(
                format!(
                    "📋 <b>Задание #{task_id}</b>\n\n\
                     Не переживайте! Попробуйте:\n\
                     1. Отправить свой код для более точной подсказки\n\
                     2. Перечитать условие задачи\n\
                     3. Начать с простого примера\n\n\
                     Выберите действие:"
                ),
                task_actions_keyboard(kim, task_id),
            ),
        )
    }
}

/// Code submission cancelled
#[must_use]
pub fn code_submission_cancelled() -> View {
    View::new("❌ Отправка кода отменена", main_menu_keyboard())
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin screens
// ─────────────────────────────────────────────────────────────────────────────

/// Keyboard of the admin menu
#[must_use]
pub fn admin_menu_keyboard() -> Keyboard {
    one_per_row(vec![
        Button::callback("➕ Добавить решение", Callback::AdminAddSolution),
        Button::callback("📋 Все решения", Callback::AdminListSolutions),
        Button::callback("🔍 Поиск по Task ID", Callback::AdminSearch),
        Button::callback("💡 Подсказки пользователей", Callback::AdminViewHints),
        Button::callback("📊 Статистика подсказок", Callback::AdminHintStats),
        Button::callback(
            "📚 Управление домашними работами",
            Callback::AdminManageHomeworks,
        ),
        Button::callback("◀️ Вернуться в бот", Callback::MainMenu),
    ])
}

/// Single "cancel" button shown under wizard prompts
#[must_use]
pub fn cancel_keyboard() -> Keyboard {
    vec![vec![Button::callback("❌ Отменить", Callback::AdminCancel)]]
}

/// Admin panel
#[must_use]
pub fn admin_menu() -> View {
    View::new(
        "🔧 <b>Панель администратора</b>\n\nУправление эталонными решениями:",
        admin_menu_keyboard(),
    )
}

/// Admin wizard cancelled
#[must_use]
pub fn action_cancelled() -> View {
    View::new("❌ Действие отменено", admin_menu_keyboard())
}

/// Non-admin tried an admin action
#[must_use]
pub fn access_denied() -> View {
    View::text("⛔️ Доступ запрещён")
}

/// Reply to `/admin` from a non-admin
pub const ADMIN_COMMAND_DENIED: &str = "❌ У вас нет доступа к этой команде";

/// Alert for an admin button pressed by a non-admin
pub const ADMIN_BUTTON_DENIED: &str = "❌ У вас нет доступа к этой функции";

/// Alert for a student screen that could not be loaded
pub const LOAD_FAILED_ALERT: &str = "❌ Ошибка при загрузке данных";

/// Storage or other internal failure while building an admin screen
#[must_use]
pub fn admin_load_failed() -> View {
    View::new("❌ Ошибка при загрузке данных.", admin_menu_keyboard())
}

/// Wizard step could not be completed because a collaborator is down
#[must_use]
pub fn service_unavailable() -> String {
    "❌ Сервис временно недоступен. Попробуйте ещё раз или отмените действие.".to_string()
}

/// Broken wizard state; the user has to start over
#[must_use]
pub fn internal_error() -> View {
    View::new(
        "❌ Внутренняя ошибка. Начните заново.",
        main_menu_keyboard(),
    )
}

/// Wizard finished without a dedicated screen
#[must_use]
pub fn wizard_done() -> View {
    View::new("✅ Готово", main_menu_keyboard())
}

/// Confirmation after the add-solution wizard
#[must_use]
pub fn solution_added(solution: &ReferenceSolution) -> View {
    let mut text = format!(
        "✅ <b>Решение успешно добавлено!</b>\n\n\
         🆔 ID решения: <code>{}</code>\n\
         📝 Task ID: <code>{}</code>\n\
         📊 Длина: {} символов\n",
        solution.id,
        solution.task_id,
        solution.solution.chars().count()
    );
    if let Some(comment) = &solution.comment {
        text.push_str(&format!("💬 Комментарий: {}\n", escape_html(comment)));
    }
    View::new(text, admin_menu_keyboard())
}

fn comment_preview(comment: Option<&str>, max_chars: usize) -> String {
    comment.map_or_else(
        || "Без комментария".to_string(),
        |c| preview(c, max_chars),
    )
}

fn solution_buttons(solutions: &[ReferenceSolution]) -> Vec<Button> {
    solutions
        .iter()
        .map(|s| {
            Button::callback(
                format!(
                    "Task {} | {}",
                    s.task_id,
                    comment_preview(s.comment.as_deref(), 20)
                ),
                Callback::AdminViewSolution(s.id),
            )
        })
        .collect()
}

/// One page of reference solutions; `page` is clamped into range
#[must_use]
pub fn solution_list(solutions: &[ReferenceSolution], page: i64) -> View {
    let Some(window) = clamp_page(page, solutions.len(), PAGE_SIZE) else {
        return View::new(
            "📋 <b>Список решений</b>\n\n❌ В базе нет решений",
            admin_menu_keyboard(),
        );
    };

    let text = format!(
        "📋 <b>Список решений</b>\n\nВсего: {}\nСтраница: {} из {}\n\nВыберите решение:",
        solutions.len(),
        window.index + 1,
        window.pages
    );

    let mut keyboard = one_per_row(solution_buttons(&solutions[window.start..window.end]));
    let index = i64::try_from(window.index).unwrap_or(i64::MAX);
    let mut nav = Vec::new();
    if window.has_prev() {
        nav.push(Button::callback("⬅️ Назад", Callback::AdminListPage(index - 1)));
    }
    if window.has_next() {
        nav.push(Button::callback("Вперед ➡️", Callback::AdminListPage(index + 1)));
    }
    if !nav.is_empty() {
        keyboard.push(nav);
    }
    keyboard.push(vec![Button::callback("◀️ В админ-меню", Callback::AdminMenu)]);
    View::new(text, keyboard)
}

const TRUNCATED_MARK: &str = "\n\n... (слишком длинное)";

/// Escapes `code`, cutting it so the escaped text fits into `budget` chars
fn fit_code(code: &str, budget: usize) -> String {
    let total = code.chars().count();
    let mut keep = total;
    loop {
        let mut escaped = escape_html(&truncate_str(code, keep));
        if keep < total {
            escaped.push_str(TRUNCATED_MARK);
        }
        let len = escaped.chars().count();
        if len <= budget || keep == 0 {
            return escaped;
        }
        keep = keep.saturating_sub(len - budget);
    }
}

/// Reference solution with its code
#[must_use]
pub fn solution_detail(solution: &ReferenceSolution) -> View {
    let mut header = format!(
        "📝 <b>Решение #{}</b>\n\n🆔 Task ID: <code>{}</code>\n📅 Создано: {}\n",
        solution.id,
        solution.task_id,
        format_date(&solution.created_at)
    );
    if let Some(comment) = &solution.comment {
        header.push_str(&format!("💬 Комментарий: <i>{}</i>\n", escape_html(comment)));
    }
    header.push_str("\n📄 <b>Решение:</b>\n");

    let budget = TELEGRAM_MESSAGE_LIMIT.saturating_sub(header.chars().count() + "<pre></pre>".len());
    let text = format!("{header}<pre>{}</pre>", fit_code(&solution.solution, budget));
    let keyboard = vec![
        vec![Button::callback("🗑️ Удалить", Callback::AdminDelete(solution.id))],
        vec![Button::callback("◀️ Назад", Callback::AdminListSolutions)],
    ];
    View::new(text, keyboard)
}

/// Delete confirmation for a reference solution
#[must_use]
pub fn solution_confirm_delete(solution: &ReferenceSolution) -> View {
    let mut text = format!(
        "⚠️ <b>Подтверждение удаления</b>\n\n\
         Вы действительно хотите удалить решение?\n\n\
         🆔 ID: {}\n📝 Task ID: {}\n",
        solution.id, solution.task_id
    );
    if let Some(comment) = &solution.comment {
        text.push_str(&format!("💬 {}\n", escape_html(comment)));
    }
    View::new(
        text,
        one_per_row(vec![
            Button::callback("✅ Да, удалить", Callback::AdminConfirmDelete(solution.id)),
            Button::callback("❌ Отмена", Callback::AdminViewSolution(solution.id)),
        ]),
    )
}

/// Reference solution removed
#[must_use]
pub fn solution_deleted() -> View {
    View::new("✅ <b>Решение удалено</b>", admin_menu_keyboard())
}

/// Result of the search wizard
#[must_use]
pub fn search_results(task_id: i64, solutions: &[ReferenceSolution]) -> View {
    if solutions.is_empty() {
        return View::new(
            format!("❌ Для задачи <code>{task_id}</code> не найдено решений"),
            admin_menu_keyboard(),
        );
    }

    let mut text = format!(
        "🔍 <b>Результаты поиска</b>\n\nTask ID: <code>{task_id}</code>\nНайдено решений: {}\n\n",
        solutions.len()
    );
    let shown = solutions.len().min(PAGE_SIZE);
    for (idx, s) in solutions[..shown].iter().enumerate() {
        text.push_str(&format!(
            "{}. ID: {} | {}\n",
            idx + 1,
            s.id,
            escape_html(&comment_preview(s.comment.as_deref(), 30))
        ));
    }
    let hidden = solutions.len() - shown;
    if hidden > 0 {
        text.push_str(&format!(
            "\n…и ещё {hidden}. Остальные: «📋 Все решения» в админ-меню.\n"
        ));
    }

    let mut keyboard = one_per_row(solution_buttons(&solutions[..shown]));
    keyboard.push(vec![Button::callback("◀️ В админ-меню", Callback::AdminMenu)]);
    View::new(text, keyboard)
}

/// Most recent hints given to students
#[must_use]
pub fn recent_hints(hints: &[Hint]) -> View {
    if hints.is_empty() {
        return View::new(
            "📊 <b>Подсказки пользователей</b>\n\nПока нет ни одной подсказки.",
            admin_menu_keyboard(),
        );
    }

    let mut text = format!("💡 <b>Последние {} подсказок:</b>\n\n", hints.len());
    for (idx, hint) in hints.iter().enumerate() {
        let (kind_emoji, kind) = match hint.hint_type {
            HintType::Start => ("🎯", "Начало"),
            HintType::Analyze => ("🔍", "Анализ"),
        };
        let rating = match hint.was_helpful {
            None => "⏳",
            Some(true) => "✅",
            Some(false) => "❌",
        };
        text.push_str(&format!(
            "{}. {kind_emoji} <b>{kind}</b> | Task {}\n\
             \u{20}  👤 User ID: <code>{}</code>\n\
             \u{20}  📅 {} | {rating}\n\
             \u{20}  💬 {}\n\n",
            idx + 1,
            hint.task_id,
            hint.user_id,
            hint.created_at.format("%d.%m %H:%M"),
            escape_html(&preview(&hint.hint_text, 50))
        ));
    }
    View::new(text, admin_menu_keyboard())
}

/// Hint statistics for the last `stats.days` days
#[must_use]
pub fn hint_stats(stats: &HintStats) -> View {
    View::new(
        format!(
            "📊 <b>Статистика подсказок</b>\n\
             За последние {} дней\n\n\
             📝 Всего подсказок: <b>{}</b>\n\
             ✅ Полезных: <b>{}</b>\n\
             ❌ Не полезных: <b>{}</b>\n\
             ⏳ Без оценки: <b>{}</b>\n\n\
             📈 Процент полезных: <b>{}%</b>",
            stats.days,
            stats.total,
            stats.helpful,
            stats.not_helpful,
            stats.not_rated,
            stats.helpful_percent()
        ),
        admin_menu_keyboard(),
    )
}

/// All homeworks with their status
#[must_use]
pub fn homework_admin_list(homeworks: &[Homework]) -> View {
    let text = if homeworks.is_empty() {
        "📚 <b>Управление домашними работами</b>\n\nСписок пуст.".to_string()
    } else {
        format!(
            "📚 <b>Управление домашними работами</b>\n\nВсего: {}\n\n✅ - активна | 🔒 - закрыта",
            homeworks.len()
        )
    };

    let mut buttons: Vec<Button> = homeworks
        .iter()
        .map(|hw| {
            let status = if hw.is_active { "✅" } else { "🔒" };
            Button::callback(
                format!("{status} {}", hw.display_title()),
                Callback::AdminHwView(hw.kim),
            )
        })
        .collect();
    buttons.push(Button::callback("➕ Добавить новую работу", Callback::AdminHwAdd));
    buttons.push(Button::callback("◀️ В админ-меню", Callback::AdminMenu));
    View::new(text, one_per_row(buttons))
}

/// Homework card with the toggle and delete actions
#[must_use]
pub fn homework_admin_detail(homework: &Homework) -> View {
    let status = if homework.is_active {
        "✅ Активна"
    } else {
        "🔒 Закрыта"
    };
    let text = format!(
        "📚 <b>{}</b>\n\nKIM: <code>{}</code>\nСтатус: {status}\nСоздана: {}\n\nВыберите действие:",
        escape_html(&homework.display_title()),
        homework.kim,
        format_date(&homework.created_at)
    );
    let toggle = if homework.is_active {
        "🔒 Закрыть доступ"
    } else {
        "✅ Открыть доступ"
    };
    View::new(
        text,
        one_per_row(vec![
            Button::callback(toggle, Callback::AdminHwToggle(homework.kim)),
            Button::callback("🗑️ Удалить", Callback::AdminHwDelete(homework.kim)),
            Button::callback("◀️ Назад к списку", Callback::AdminManageHomeworks),
        ]),
    )
}

/// Alert shown after toggling a homework
#[must_use]
pub fn homework_toggled_alert(homework: &Homework) -> String {
    let status = if homework.is_active { "открыт" } else { "закрыт" };
    format!("✅ Доступ {status}")
}

/// Delete confirmation for a homework
#[must_use]
pub fn homework_confirm_delete(homework: &Homework) -> View {
    View::new(
        format!(
            "⚠️ <b>Подтверждение удаления</b>\n\n\
             Вы уверены, что хотите удалить:\n<b>{}</b> (KIM: {})?",
            escape_html(&homework.display_title()),
            homework.kim
        ),
        one_per_row(vec![
            Button::callback("✅ Да, удалить", Callback::AdminHwConfirmDelete(homework.kim)),
            Button::callback("❌ Отмена", Callback::AdminHwView(homework.kim)),
        ]),
    )
}

/// Alert shown after deleting a homework
pub const HOMEWORK_DELETED_ALERT: &str = "✅ Домашняя работа удалена";

/// Confirmation after the add-homework wizard
#[must_use]
pub fn homework_added(homework: &Homework) -> View {
    let mut text = "✅ Домашняя работа добавлена!\n\n".to_string();
    if let Some(title) = &homework.title {
        text.push_str(&format!("Название: {}\n", escape_html(title)));
    }
    text.push_str(&format!("KIM: {}\nСтатус: ✅ Активна", homework.kim));
    View::new(text, admin_menu_keyboard())
}
