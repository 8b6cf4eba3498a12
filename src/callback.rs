//! Inline keyboard selection tokens
//!
//! Every button the bot renders carries one of these tokens. Screens are
//! rebuilt from the ids embedded in the token, nothing else is remembered
//! between button presses.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Token that does not match any known button
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown callback data: {0}")]
pub struct UnknownCallback(pub String);

/// Parsed callback data of an inline button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// Student main menu
    MainMenu,
    /// Active homeworks
    HomeworkList,
    /// One homework variant
    Homework {
        /// Variant id
        kim: i64,
    },
    /// Task list of a variant
    Hints {
        /// Variant id
        kim: i64,
    },
    /// Actions for one task
    Task {
        /// Variant id
        kim: i64,
        /// Task id
        task_id: i64,
    },
    /// "How to start" hint
    HintStart {
        /// Variant id
        kim: i64,
        /// Task id
        task_id: i64,
    },
    /// Opens the code submission wizard
    SubmitCode {
        /// Variant id
        kim: i64,
        /// Task id
        task_id: i64,
    },
    /// Helpful / not helpful vote on the last hint
    Feedback {
        /// Variant id
        kim: i64,
        /// Task id
        task_id: i64,
        /// Vote
        helpful: bool,
    },

    /// Admin main menu
    AdminMenu,
    /// Starts the add-solution wizard
    AdminAddSolution,
    /// First page of reference solutions
    AdminListSolutions,
    /// Page of reference solutions; out-of-range values are clamped
    AdminListPage(i64),
    /// Reference solution detail
    AdminViewSolution(i64),
    /// Delete confirmation for a reference solution
    AdminDelete(i64),
    /// Confirmed delete of a reference solution
    AdminConfirmDelete(i64),
    /// Starts the search wizard
    AdminSearch,
    /// Cancels the running wizard
    AdminCancel,
    /// Most recent hints
    AdminViewHints,
    /// Hint statistics
    AdminHintStats,
    /// Homework management list
    AdminManageHomeworks,
    /// Homework detail
    AdminHwView(i64),
    /// Open / close a homework
    AdminHwToggle(i64),
    /// Delete confirmation for a homework
    AdminHwDelete(i64),
    /// Confirmed delete of a homework
    AdminHwConfirmDelete(i64),
    /// Starts the add-homework wizard
    AdminHwAdd,
}

impl Callback {
    /// Buttons that only the administrator may press
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::AdminMenu
                | Self::AdminAddSolution
                | Self::AdminListSolutions
                | Self::AdminListPage(_)
                | Self::AdminViewSolution(_)
                | Self::AdminDelete(_)
                | Self::AdminConfirmDelete(_)
                | Self::AdminSearch
                | Self::AdminCancel
                | Self::AdminViewHints
                | Self::AdminHintStats
                | Self::AdminManageHomeworks
                | Self::AdminHwView(_)
                | Self::AdminHwToggle(_)
                | Self::AdminHwDelete(_)
                | Self::AdminHwConfirmDelete(_)
                | Self::AdminHwAdd
        )
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainMenu => write!(f, "main_menu"),
            Self::HomeworkList => write!(f, "homework_list"),
            Self::Homework { kim } => write!(f, "homework_{kim}"),
            Self::Hints { kim } => write!(f, "hints_{kim}"),
            Self::Task { kim, task_id } => write!(f, "task_{kim}_{task_id}"),
            Self::HintStart { kim, task_id } => write!(f, "hint_start_{kim}_{task_id}"),
            Self::SubmitCode { kim, task_id } => write!(f, "submit_code_{kim}_{task_id}"),
            Self::Feedback {
                kim,
                task_id,
                helpful,
            } => {
                let vote = if *helpful { "yes" } else { "no" };
                write!(f, "feedback_{vote}_{kim}_{task_id}")
            }
            Self::AdminMenu => write!(f, "admin_menu"),
            Self::AdminAddSolution => write!(f, "admin_add_solution"),
            Self::AdminListSolutions => write!(f, "admin_list_solutions"),
            Self::AdminListPage(page) => write!(f, "admin_list_page_{page}"),
            Self::AdminViewSolution(id) => write!(f, "admin_view_solution_{id}"),
            Self::AdminDelete(id) => write!(f, "admin_delete_{id}"),
            Self::AdminConfirmDelete(id) => write!(f, "admin_confirm_delete_{id}"),
            Self::AdminSearch => write!(f, "admin_search_solutions"),
            Self::AdminCancel => write!(f, "admin_cancel"),
            Self::AdminViewHints => write!(f, "admin_view_hints"),
            Self::AdminHintStats => write!(f, "admin_hint_stats"),
            Self::AdminManageHomeworks => write!(f, "admin_manage_homeworks"),
            Self::AdminHwView(kim) => write!(f, "admin_hw_view_{kim}"),
            Self::AdminHwToggle(kim) => write!(f, "admin_hw_toggle_{kim}"),
            Self::AdminHwDelete(kim) => write!(f, "admin_hw_delete_{kim}"),
            Self::AdminHwConfirmDelete(kim) => write!(f, "admin_hw_confirm_delete_{kim}"),
            Self::AdminHwAdd => write!(f, "admin_hw_add"),
        }
    }
}

fn one_id(rest: &str) -> Option<i64> {
    rest.parse().ok()
}

fn two_ids(rest: &str) -> Option<(i64, i64)> {
    let (kim, task_id) = rest.split_once('_')?;
    Some((kim.parse().ok()?, task_id.parse().ok()?))
}

impl FromStr for Callback {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let fixed = match data {
            "main_menu" => Some(Self::MainMenu),
            "homework_list" => Some(Self::HomeworkList),
            "admin_menu" => Some(Self::AdminMenu),
            "admin_add_solution" => Some(Self::AdminAddSolution),
            "admin_list_solutions" => Some(Self::AdminListSolutions),
            "admin_search_solutions" => Some(Self::AdminSearch),
            "admin_cancel" => Some(Self::AdminCancel),
            "admin_view_hints" => Some(Self::AdminViewHints),
            "admin_hint_stats" => Some(Self::AdminHintStats),
            "admin_manage_homeworks" => Some(Self::AdminManageHomeworks),
            "admin_hw_add" => Some(Self::AdminHwAdd),
            _ => None,
        };
        if let Some(callback) = fixed {
            return Ok(callback);
        }

        let with_one: [(&str, fn(i64) -> Self); 10] = [
            ("homework_", |kim| Self::Homework { kim }),
            ("hints_", |kim| Self::Hints { kim }),
            ("admin_list_page_", Self::AdminListPage),
            ("admin_view_solution_", Self::AdminViewSolution),
            ("admin_delete_", Self::AdminDelete),
            ("admin_confirm_delete_", Self::AdminConfirmDelete),
            ("admin_hw_view_", Self::AdminHwView),
            ("admin_hw_toggle_", Self::AdminHwToggle),
            ("admin_hw_delete_", Self::AdminHwDelete),
            ("admin_hw_confirm_delete_", Self::AdminHwConfirmDelete),
        ];
        for (prefix, build) in with_one {
            if let Some(id) = data.strip_prefix(prefix).and_then(one_id) {
                return Ok(build(id));
            }
        }

        let with_two: [(&str, fn(i64, i64) -> Self); 5] = [
            ("task_", |kim, task_id| Self::Task { kim, task_id }),
            ("hint_start_", |kim, task_id| Self::HintStart { kim, task_id }),
            ("submit_code_", |kim, task_id| Self::SubmitCode { kim, task_id }),
            ("feedback_yes_", |kim, task_id| Self::Feedback {
                kim,
                task_id,
                helpful: true,
            }),
            ("feedback_no_", |kim, task_id| Self::Feedback {
                kim,
                task_id,
                helpful: false,
            }),
        ];
        for (prefix, build) in with_two {
            if let Some((kim, task_id)) = data.strip_prefix(prefix).and_then(two_ids) {
                return Ok(build(kim, task_id));
            }
        }

        Err(UnknownCallback(data.to_string()))
    }
}
