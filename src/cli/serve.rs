//! Serve command: long-running event loop over stdin
//!
//! The chat gateway is a separate process; it pipes inbound events to us as
//! newline-delimited JSON and relays whatever we print on stdout back to the
//! channel. The folder cache lives for the life of this process, with the
//! periodic sweeper running alongside.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bot::{self, ChatEvent, OperatorCommand};
use crate::cache::{FolderCache, spawn_sweeper};
use crate::cli::{build_driver, drive_client, load_config};
use crate::error::Result;

/// Run the event loop until stdin closes
pub async fn run(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate_storage()?;

    let drive = Arc::new(drive_client(&config)?);
    let cache = Arc::new(FolderCache::new());
    let driver = build_driver(&config, drive, Arc::clone(&cache))?;

    let sweeper = spawn_sweeper(
        Arc::clone(&cache),
        Duration::from_secs(config.uploads.cache_sweep_hours * 60 * 60),
    );

    log::info!("Serving; reading chat events from stdin");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: ChatEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("Skipping undecodable event line: {}", err);
                continue;
            }
        };
        log::debug!(
            "Event {} from '{}' in #{}",
            event.id,
            event.author.display_name,
            event.channel
        );

        if let Some(command) = bot::parse_command(&event.content) {
            handle_command(command, &cache);
            continue;
        }

        let batches = bot::collect_batches(std::slice::from_ref(&event), &config.uploads);
        if !bot::meets_minimum(&batches, &config.uploads) {
            log::debug!(
                "Event {}: {} eligible photos, below minimum {}",
                event.id,
                bot::eligible_total(&batches),
                config.uploads.min_photos
            );
            continue;
        }

        match driver.run(&event.id, &batches).await {
            Ok(report) => println!("{}", bot::summarize(&report)),
            Err(err) => {
                log::error!("Session {} failed: {}", event.id, err);
                println!("Error uploading photos: {}", err);
            }
        }
    }

    sweeper.abort();
    Ok(())
}

/// Apply an operator cache command and print the channel response
fn handle_command(command: OperatorCommand, cache: &FolderCache) {
    match command {
        OperatorCommand::ClearCache => {
            let evicted = cache.clear();
            println!(
                "Cleared folder cache ({} entries removed). Next uploads will refresh folder information.",
                evicted
            );
        }
        OperatorCommand::ClearUserCache { user } => {
            let removed = cache.invalidate_matching(&user);
            println!(
                "Cleared {} folder cache entries for user \"{}\".",
                removed, user
            );
        }
        OperatorCommand::ForceReset { user } => {
            let removed = cache.invalidate_matching(&user);
            println!(
                "Cleared {} folder cache entries for user \"{}\". Their next upload will create fresh folders.",
                removed, user
            );
        }
    }
}
