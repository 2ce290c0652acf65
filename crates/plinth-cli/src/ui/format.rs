//! Formatting utilities for sizes, durations, and build summaries.

use console::Term;
use owo_colors::OwoColorize;
use plinth_bundler::BatchReport;
use std::time::Duration;

/// Format file size in human-readable format.
///
/// ```
/// use plinth::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use plinth::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print one line per built artifact and one per failed manifest to stderr.
pub fn print_build_summary(report: &BatchReport, duration: Duration) {
    let width = (Term::stderr().size().1 as usize).clamp(20, 80);
    let color = super::colors_enabled();

    if color {
        eprintln!("\n{}", "Build Summary".bold().underline());
    } else {
        eprintln!("\nBuild Summary");
    }
    eprintln!("{}", "─".repeat(width));

    for built in &report.built {
        let code_size: usize = built.functions.iter().map(|(_, size)| size).sum();
        let details = format!(
            "({} fn, {} dep, {} assets, {})",
            built.functions.len(),
            built.dependencies,
            built.assets,
            format_size(code_size as u64)
        );
        if color {
            eprintln!(
                "  {} {} {} {}",
                "▸".blue(),
                built.name.bright_white().bold(),
                built.output.display().dimmed(),
                details.dimmed()
            );
        } else {
            eprintln!("  ▸ {} {} {}", built.name, built.output.display(), details);
        }
    }
    for failed in &report.failed {
        let message = failed.error.to_string();
        if color {
            eprintln!(
                "  {} {} {}",
                "✗".red(),
                failed.manifest.display().bold(),
                message.red()
            );
        } else {
            eprintln!("  ✗ {} {}", failed.manifest.display(), message);
        }
    }

    eprintln!("{}", "─".repeat(width));
    eprintln!(
        "  Total: {} built, {} failed in {}",
        report.built.len(),
        report.failed.len(),
        format_duration(duration)
    );
}
