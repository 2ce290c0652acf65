//! Terminal output for humans: status lines and the build summary.
//!
//! ```no_run
//! use plinth::ui;
//!
//! ui::init_colors(false);
//! ui::success("Built 3 manifests");
//! ui::error("Failed to read demo.plug.yaml");
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary};
pub use messages::{error, info, success, warning};

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR, then falls back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr()
}

static COLOR: AtomicBool = AtomicBool::new(false);

/// Decide once whether status lines are colored. `no_color` comes from `--no-color`.
pub fn init_colors(no_color: bool) {
    COLOR.store(!no_color && should_use_color(), Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLOR.load(Ordering::Relaxed)
}
