//! Spinner shown while a menu is being put together.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Frames the spinner cycles through.
const FRAMES: [&str; 8] = ["🥕", "🧅", "🍅", "🥔", "🧄", "🫑", "🥦", "🍳"];

/// A spinner that cycles through ingredients.
pub struct Spinner {
    bar: ProgressBar,
    message: String,
}

impl Spinner {
    #[must_use]
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        // Template is a literal, so this only fails on a typo
        if let Ok(spinner_style) = ProgressStyle::default_spinner()
            .tick_strings(&tick_strings())
            .template("{msg} {spinner}")
        {
            bar.set_style(spinner_style);
        }

        bar.enable_steady_tick(Duration::from_millis(150));
        bar.set_message(format!("{}", style(message).bold()));

        Self {
            bar,
            message: message.to_string(),
        }
    }

    /// Replace the spinner with a checkmark.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
        println!("{} {}", style(&self.message).bold(), style("✓").green());
    }

    /// Replace the spinner with a cross.
    pub fn finish_error(&self) {
        self.bar.finish_and_clear();
        println!("{} {}", style(&self.message).bold(), style("✗").red());
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Every frame, then the final frame indicatif shows when finished.
fn tick_strings() -> Vec<&'static str> {
    let mut ticks = FRAMES.to_vec();
    ticks.push("✓");
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_strings_end_with_finish_frame() {
        let ticks = tick_strings();
        assert_eq!(ticks.len(), FRAMES.len() + 1);
        assert_eq!(ticks.last(), Some(&"✓"));
    }
}
