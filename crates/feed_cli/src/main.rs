//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load configuration (JSON file argument or `FEED_CORE_*` variables).
//! - Open the core context and print the head of the global feed.
//! - Exit non-zero with a one-line reason on failure.

use feed_core::{
    init_from_config, CoreConfig, CoreContext, FeedScope, LogNotificationSink, PageRequest,
};
use log::error;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("feed_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_json_file(path),
        None => CoreConfig::from_env(),
    }
    .map_err(|err| err.to_string())?;
    init_from_config(&config).map_err(|err| err.to_string())?;

    println!("feed_core ping={}", feed_core::ping());
    println!("feed_core version={}", feed_core::core_version());

    let grace = config.shutdown_grace();
    let ctx = CoreContext::open(config, Arc::new(LogNotificationSink))
        .map_err(|err| err.to_string())?;
    let page = ctx
        .feed()
        .list_feed(&FeedScope::default(), PageRequest::default())
        .map_err(|err| err.to_string())?;
    let rendered = serde_json::to_string_pretty(&page).map_err(|err| err.to_string())?;
    println!("{rendered}");

    ctx.shutdown(grace);
    Ok(())
}
