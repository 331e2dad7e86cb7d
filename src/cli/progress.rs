//! Progress display for a download run.

use indicatif::{ProgressBar, ProgressStyle};

/// Single bar advancing once per processed flyer link.
pub struct FlyerProgress {
    bar: ProgressBar,
}

impl FlyerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        bar.set_style(style);
        bar.set_message("Loading listing page");
        Self { bar }
    }

    /// Number of links discovered on the listing page.
    pub fn set_total(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    /// A link is being processed.
    pub fn start(&self, title: &str) {
        self.bar.set_message(truncate(title, 40));
    }

    /// The current link is done, whatever the outcome.
    pub fn advance(&self) {
        self.bar.inc(1);
    }

    /// Print above the bar without tearing it.
    pub fn println(&self, message: &str) {
        self.bar.println(message);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for FlyerProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
