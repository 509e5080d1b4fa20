//! Presentation for the voting page, leaderboard and admin console.
//!
//! `html` builds pages with `maud`, which escapes every interpolated value, so
//! participant names and judge comments can never inject markup. `text` renders
//! the same data for a terminal.

pub mod html;
pub mod text;

pub use maud::Markup;

const SCORE_EMOJI: [&str; 10] = ["😡", "😞", "😕", "😐", "🙂", "😊", "😄", "😁", "🤩", "🔥"];

/// Face shown next to the 1..=10 slider; out-of-range values clamp.
pub fn score_emoji(value: f64) -> &'static str {
    let index = if value.is_finite() {
        (value.round().clamp(1.0, 10.0) as usize) - 1
    } else {
        0
    };
    SCORE_EMOJI[index]
}

/// Averages are shown with two decimals, trailing zeros trimmed.
pub fn format_score(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub const NO_VOTES: &str = "no votes yet";
