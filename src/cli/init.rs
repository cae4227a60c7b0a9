//! Init command implementation

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};

use crate::cli::load_config;
use crate::config::Config;
use crate::drive::{DriveApi, DriveClient};
use crate::error::Result;

/// Run the interactive setup
pub async fn run(config_path: Option<&str>) -> Result<()> {
    println!("{}", "Welcome to RoadCrew!".bold().green());
    println!("Let's set up your Drive configuration.\n");

    let token: String = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter your Drive bearer token")
        .interact()?;

    let root_folder_id: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Drive folder id to file photos under")
        .interact_text()?;

    let time_zone: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Organization time zone")
        .default("America/New_York".to_string())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            input
                .parse::<chrono_tz::Tz>()
                .map(|_| ())
                .map_err(|_| format!("unknown time zone: {}", input))
        })
        .interact_text()?;

    // Probe the root folder before committing the config; a typo here is
    // the most common setup failure
    println!("\n{}", "Checking root folder access...".cyan());
    let client = DriveClient::new(token.clone())?;
    match client.get_metadata(&root_folder_id).await {
        Ok(meta) => {
            println!("{} Root folder accessible: {}", "✓".green(), meta.name.bold());
        }
        Err(err) => {
            println!(
                "{} Could not access the root folder ({}). Saving anyway; run `roadcrew check` after fixing it.",
                "⚠".yellow(),
                err
            );
        }
    }

    let mut config = load_config(config_path).unwrap_or_default();
    config.storage_token = Some(token);
    config.root_folder_id = Some(root_folder_id);
    config.time_zone = time_zone;

    let path = match config_path {
        Some(p) => std::path::PathBuf::from(p),
        None => Config::default_path()?,
    };
    config.save_to(path.clone())?;

    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        path.display()
    );
    println!("\n{}", "You're all set! Try running:".bold());
    println!(
        "  {} - Verify Drive access",
        "roadcrew check".cyan()
    );
    println!(
        "  {} - Upload photos from an event file",
        "roadcrew upload <event.json>".cyan()
    );

    Ok(())
}
