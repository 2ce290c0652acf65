//! Bundle command implementation.
//!
//! Implements `plinth bundle DIR OUTPUT`: writes every file under a folder into
//! one JSON object of data URLs, optionally rebundling after changes.

use std::time::{Duration, Instant};

use plinth_bundler::{bundle_folder, watch_folder};

use crate::cli::BundleArgs;
use crate::commands::utils;
use crate::config::PlinthConfig;
use crate::error::Result;
use crate::ui;

/// Execute the bundle command.
pub async fn execute(args: BundleArgs) -> Result<()> {
    let config = PlinthConfig::load_for_bundle(&args)?;
    config.validate_for_bundle(args.watch)?;
    utils::validate_folder(&args.dir)?;

    if args.watch {
        ui::info(&format!(
            "Watching {}, press Ctrl-C to stop",
            args.dir.display()
        ));
        let shutdown = utils::shutdown_on_ctrl_c();
        watch_folder(
            args.dir,
            args.output,
            Duration::from_millis(config.debounce_ms),
            shutdown,
        )
        .await?;
        ui::info("Stopped watching");
        return Ok(());
    }

    let start = Instant::now();
    let bundle = bundle_folder(&args.dir, &args.output).await?;
    ui::success(&format!(
        "Bundled {} file(s) ({}) into {} in {}",
        bundle.len(),
        ui::format_size(bundle.total_size() as u64),
        args.output.display(),
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}
