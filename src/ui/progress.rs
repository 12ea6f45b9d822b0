//! Spinners and upload progress with a CI fallback

use super::context::UiContext;
use crate::upload::{UploadEvent, UploadObserver};
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

const UPLOAD_TEMPLATE: &str =
    "  {spinner:.cyan} Uploading  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}";

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            eprintln!("{} {}", style("✗").red(), message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Per-file progress of an image batch.
///
/// The bar stays hidden until the batch actually starts, so a form rejected
/// before upload draws nothing.
pub struct UploadProgress {
    bar: Option<ProgressBar>,
}

impl UploadProgress {
    pub fn new(ctx: &UiContext) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());
            let bar_style = ProgressStyle::default_bar()
                .template(UPLOAD_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(bar_style);
            bar
        });
        Self { bar }
    }

    /// Callback to hand to the upload coordinator
    pub fn observer(&self) -> UploadObserver {
        let bar = self.bar.clone();
        Arc::new(move |event: UploadEvent<'_>| match (event, &bar) {
            (UploadEvent::Started { total }, Some(bar)) => {
                bar.set_length(total as u64);
                bar.set_draw_target(ProgressDrawTarget::stderr());
                bar.enable_steady_tick(Duration::from_millis(120));
            }
            (UploadEvent::Started { total }, None) => {
                println!("Uploading {} image(s)...", total);
            }
            (UploadEvent::Finished { name, ok }, Some(bar)) => {
                bar.inc(1);
                bar.set_message(name.to_string());
                if !ok {
                    bar.println(format!("  {} {}", style("✗").red(), name));
                }
            }
            (UploadEvent::Finished { name, ok }, None) => {
                let mark = if ok {
                    style("[OK]").green()
                } else {
                    style("[FAIL]").red()
                };
                println!("  {} {}", mark, name);
            }
        })
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Loading places...");
        spinner.stop("3 place(s)");

        let mut failing = TaskSpinner::new(&ctx);
        failing.start("Deleting place 7...");
        failing.stop_error("Delete failed");
    }

    #[test]
    fn upload_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = UploadProgress::new(&ctx);
        assert!(progress.bar.is_none());

        let observer = progress.observer();
        observer(UploadEvent::Started { total: 2 });
        observer(UploadEvent::Finished {
            name: "casbah.jpg",
            ok: true,
        });
        observer(UploadEvent::Finished {
            name: "fail.jpg",
            ok: false,
        });
        progress.finish();
    }
}
