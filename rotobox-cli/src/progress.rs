// rotobox-cli/src/progress.rs
//
// Render progress bar driven by the pipeline's per-frame callback.

use indicatif::{ProgressBar, ProgressStyle};
use rotobox_core::RenderProgress;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} frames";

pub struct RenderBar {
    bar: ProgressBar,
}

impl RenderBar {
    /// A visible bar, or a hidden one that ignores updates.
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(style(SPINNER_TEMPLATE));
        Self { bar }
    }

    pub fn update(&self, progress: RenderProgress) {
        // Switch from spinner to bar once the total is known.
        if let Some(total) = progress.total {
            if self.bar.length() != Some(total) {
                self.bar.set_length(total);
                self.bar.set_style(style(BAR_TEMPLATE).progress_chars("#>."));
            }
        }
        self.bar.set_position(progress.frame);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_bar_tracks_position_and_length() {
        let bar = RenderBar::new(false);
        bar.update(RenderProgress { frame: 3, total: None });
        assert_eq!(bar.bar.position(), 3);

        bar.update(RenderProgress { frame: 4, total: Some(10) });
        assert_eq!(bar.bar.position(), 4);
        assert_eq!(bar.bar.length(), Some(10));
        bar.finish();
    }
}
