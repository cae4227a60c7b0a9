//! One-shot upload command: run a session from a chat-event file

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use crate::bot::{self, ChatEvent};
use crate::cache::FolderCache;
use crate::cli::{build_driver, drive_client, load_config};
use crate::error::Result;
use crate::output;

/// Run one upload session from the events in `event_file`
pub async fn run(event_file: &Path, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate_storage()?;

    let events = read_events(event_file)?;
    let batches = bot::collect_batches(&events, &config.uploads);

    if !bot::meets_minimum(&batches, &config.uploads) {
        println!(
            "Not enough eligible photos ({} found, minimum {}).",
            bot::eligible_total(&batches),
            config.uploads.min_photos
        );
        return Ok(());
    }

    let drive = Arc::new(drive_client(&config)?);
    let cache = Arc::new(FolderCache::new());
    let driver = build_driver(&config, drive, cache)?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!(
        "Uploading {} photos...",
        bot::eligible_total(&batches)
    ));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let session_id = events
        .first()
        .map(|e| e.id.clone())
        .unwrap_or_else(|| "manual".to_string());
    let result = driver.run(&session_id, &batches).await;
    spinner.finish_and_clear();

    let report = result?;
    println!("{}", output::render_report(&report));
    Ok(())
}

/// Read a single event or an array of events from a JSON file
fn read_events(path: &Path) -> Result<Vec<ChatEvent>> {
    let contents = std::fs::read_to_string(path)?;

    if let Ok(events) = serde_json::from_str::<Vec<ChatEvent>>(&contents) {
        return Ok(events);
    }
    let single: ChatEvent = serde_json::from_str(&contents)?;
    Ok(vec![single])
}
