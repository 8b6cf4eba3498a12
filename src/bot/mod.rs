//! Telegram transport
//!
//! Everything that talks to the Bot API lives here; the rest of the crate
//! works with [`crate::views::View`] values only.

/// Inline button handling
pub mod callbacks;
/// Command and text message handlers
pub mod handlers;
/// Keyboard conversion
pub mod keyboards;
/// Telegram calls with automatic retry
pub mod resilient;

pub use callbacks::{CallbackRouter, Outcome};
