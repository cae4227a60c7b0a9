//! Status command implementation

use colored::Colorize;

use crate::cli::load_config;
use crate::config::Config;
use crate::error::Result;

/// Run the status command to display configuration status
pub fn run(config_path: Option<&str>) -> Result<()> {
    println!("{}\n", "RoadCrew Configuration Status".bold());

    match load_config(config_path) {
        Ok(config) => {
            let path = match config_path {
                Some(p) => std::path::PathBuf::from(p),
                None => Config::default_path()?,
            };
            println!("Config file: {}", path.display().to_string().cyan());
            println!();

            if config.storage_token.is_some() {
                println!("{} Storage token configured", "✓".green());
            } else {
                println!("{} Storage token not configured", "✗".red());
                println!("  → Run 'roadcrew init' to configure");
            }

            if let Some(ref root) = config.root_folder_id {
                println!("{} Root folder: {}", "✓".green(), root);
            } else {
                println!("{} No root folder set", "✗".red());
                println!("  → Run 'roadcrew init' to configure");
            }

            println!("{} Time zone: {}", "○".dimmed(), config.time_zone);
            println!(
                "{} Upload gate: {}+ photos, types {}",
                "○".dimmed(),
                config.uploads.min_photos,
                config.uploads.accepted_types.join(", ")
            );
            println!(
                "{} Cache sweep interval: {}h",
                "○".dimmed(),
                config.uploads.cache_sweep_hours
            );
            println!();
        }
        Err(_) => {
            println!("{} Configuration not found", "✗".red());
            println!();
            println!(
                "Run {} to create a configuration file.",
                "roadcrew init".cyan()
            );
            println!();
        }
    }

    Ok(())
}
