//! Terminal presentation: pure render functions plus the raw-mode console.

mod console;
mod render;

pub use console::{action_for_key, raw_mode_text, Console, KeyAction, KEY_HELP};
pub use render::{
    action_text, capitalize, category_table, reasoning_text, render_result, status_line,
    status_message, summary_line, MessageLevel, StatusMessage,
};
