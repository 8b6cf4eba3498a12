//! Prompt texts for hint generation
//!
//! The reference solution is never shown to the student; the start hint only
//! sees its first meaningful line.

/// System prompt shared by both hint kinds
pub const SYSTEM_PROMPT: &str =
    "You are a helpful programming tutor. Always reply in Russian.";

/// First line of `solution` that is neither blank nor a `#` comment
#[must_use]
pub fn first_meaningful_line(solution: &str) -> Option<&str> {
    solution
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Prompt asking to explain the first line of the reference solution
#[must_use]
pub fn start_hint_prompt(task_description: &str, reference_solution: &str) -> String {
    let first_line = first_meaningful_line(reference_solution).unwrap_or_default();
    format!(
        "Role: You are a helpful programming tutor.\n\n\
         Task: {task_description}\n\n\
         First line of the reference solution: {first_line}\n\n\
         Instructions:\n\
         - Explain in ONE sentence what the first line does\n\
         - DO NOT write the code itself\n\
         - Be clear and concise\n\
         - Reply in Russian\n\
         - Your response must be ONLY ONE sentence"
    )
}

/// Prompt comparing the student's code with the reference solution
#[must_use]
pub fn analyze_prompt(task_description: &str, reference_solution: &str, user_code: &str) -> String {
    format!(
        "Role: You are a helpful senior software engineer mentoring a junior student.\n\n\
         Task: The student is trying to solve the following problem: {task_description}\n\n\
         Reference Solution (Do not reveal): {reference_solution}\n\n\
         Student's Code: {user_code}\n\n\
         Instructions:\n\
         - Analyze the student's code compared to the reference.\n\
         - Identify the logic error or syntax error.\n\
         - Provide a helpful hint in ONE sentence.\n\
         - CRITICAL: Do NOT write the corrected code. Do NOT give the answer directly. Encourage them to think.\n\
         - Reply in Russian.\n\
         - Your response must be ONLY ONE sentence with a hint."
    )
}
