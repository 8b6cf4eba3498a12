//! Telegram bot that helps students with programming homework.
//!
//! Students browse homework variants and ask for a "how to start" hint or a
//! review of their code; hints are generated from reference solutions that
//! the administrator maintains through multi-step wizards.

#![deny(missing_docs)]

/// Telegram transport
pub mod bot;
/// Inline keyboard selection tokens
pub mod callback;
/// Settings and constants
pub mod config;
/// Homework variant API client
pub mod content;
/// Multi-step wizards
pub mod conversation;
/// Hint generation
pub mod llm;
/// Browsing screens
pub mod review;
/// SQLite persistence
pub mod storage;
/// Start hints, code analysis and feedback
pub mod tutor;
/// Text and retry helpers
pub mod utils;
/// Screens
pub mod views;
