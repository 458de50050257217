//! Terminal progress bar sink (indicatif).

use crate::domain::ProgressEvent;
use crate::ports::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.magenta} [{elapsed_precise}] {bar:40.cyan/magenta} {percent:>3}% {msg}";
const BAR_SCALE: u64 = 1000;

/// Draws [`ProgressEvent`]s as a single bar. Events without a total only update the message.
pub struct BarProgressSink {
    bar: ProgressBar,
}

impl BarProgressSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_SCALE);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Clears the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Bar position for `progress` out of `total`, scaled to [0, BAR_SCALE].
fn scaled_position(progress: f64, total: f64) -> Option<u64> {
    if total <= 0.0 || !progress.is_finite() || !total.is_finite() {
        return None;
    }
    let ratio = (progress / total).clamp(0.0, 1.0);
    Some((ratio * BAR_SCALE as f64).round() as u64)
}

impl ProgressSink for BarProgressSink {
    fn notify(&self, event: ProgressEvent) {
        if let Some(pos) = scaled_position(event.progress, event.total) {
            self.bar.set_position(pos);
        }
        self.bar.set_message(event.message);
    }
}
