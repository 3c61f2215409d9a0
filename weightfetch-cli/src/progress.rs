//! `indicatif` progress bars for transfers.

use std::cell::RefCell;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use weightfetch::download::TransferProgress;

const BAR_TEMPLATE: &str =
    "{msg:30} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} eta {eta}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg:30} {bytes} {bytes_per_sec}";

/// One progress bar per transfer, drawn on stderr.
#[derive(Default)]
pub struct BarProgress {
    current: RefCell<Option<ProgressBar>>,
    hidden: bool,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            current: RefCell::new(None),
            hidden: true,
        }
    }

    fn style(total: u64) -> ProgressStyle {
        let (template, fallback) = if total > 0 {
            (BAR_TEMPLATE, ProgressStyle::default_bar())
        } else {
            (SPINNER_TEMPLATE, ProgressStyle::default_spinner())
        };
        ProgressStyle::with_template(template)
            .map(|s| s.progress_chars("=> "))
            .unwrap_or(fallback)
    }
}

impl TransferProgress for BarProgress {
    fn begin(&self, label: &str, position: u64, total: u64) {
        let bar = if total > 0 {
            ProgressBar::new(total)
        } else {
            ProgressBar::new_spinner()
        };
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(Self::style(total));
        bar.set_message(label.to_string());
        bar.set_position(position);
        *self.current.borrow_mut() = Some(bar);
    }

    fn advance(&self, position: u64) {
        if let Some(bar) = self.current.borrow().as_ref() {
            bar.set_position(position);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.current.borrow_mut().take() {
            bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_tracks_absolute_position() {
        let progress = BarProgress::hidden();
        progress.begin("sd-v1-4.ckpt", 1_000, 5_000);
        progress.advance(3_000);

        let position = progress.current.borrow().as_ref().map(|b| b.position());
        assert_eq!(position, Some(3_000));

        progress.finish();
        assert!(progress.current.borrow().is_none());
    }

    #[test]
    fn test_advance_without_begin_is_ignored() {
        let progress = BarProgress::hidden();
        progress.advance(10);
        progress.finish();
    }
}
