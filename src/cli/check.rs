//! Check command: verify Drive access and optionally share a probe folder

use colored::Colorize;

use crate::cli::{drive_client, load_config};
use crate::drive::DriveApi;
use crate::error::{ConfigError, Result};

/// Name of the probe folder created when sharing access with an operator
const PROBE_FOLDER_NAME: &str = "RoadCrew_Access_Probe";

/// Verify that the configured root folder is reachable. With `share`, also
/// create a probe folder under it and grant the email writer access so a
/// human can confirm visibility from their own Drive.
pub async fn run(share: Option<&str>, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate_storage()?;

    let root = config
        .root_folder_id
        .clone()
        .ok_or(ConfigError::MissingRootFolder)?;
    let client = drive_client(&config)?;

    match client.get_metadata(&root).await {
        Ok(meta) => {
            println!(
                "{} Root folder accessible: {} ({})",
                "✓".green(),
                meta.name.bold(),
                meta.id
            );
        }
        Err(err) => {
            println!("{} Cannot access root folder {}: {}", "✗".red(), root, err);
            return Err(err.into());
        }
    }

    if let Some(email) = share {
        println!("Creating probe folder and sharing with {}...", email.cyan());
        let folder_id = client.create_folder(PROBE_FOLDER_NAME, &root).await?;
        client.grant_permission(&folder_id, "writer", email).await?;
        println!(
            "{} Created folder '{}' ({}) and granted writer access to {}",
            "✓".green(),
            PROBE_FOLDER_NAME,
            folder_id,
            email
        );
    }

    Ok(())
}
