//! Terminal output for the `placeboard` binary
//!
//! Uses `cliclack` framing, spinners and prompts on an interactive terminal
//! and falls back to plain, line-oriented output in pipes and CI.
//!
//! ```rust,ignore
//! use placeboard::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Deleting place 7...");
//! dashboard.delete_place("7").await?;
//! spinner.stop("Place 7 deleted");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, remark, section, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::{TaskSpinner, UploadProgress};
pub use prompts::{confirm, password};
pub use theme::{init_theme, PlaceboardTheme};
