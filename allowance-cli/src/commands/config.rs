//! Config command - show or change settings.json

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use allowance_core::config::{Config, CLOUD_DIR_ENV};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show,
    /// Change stored settings; other fields in settings.json are kept
    Set {
        /// Name announced to peer devices
        #[arg(long)]
        device_name: Option<String>,
        /// Shared directory holding the cloud copy of the ledger
        #[arg(long, conflicts_with = "no_cloud_dir")]
        cloud_dir: Option<PathBuf>,
        /// Stop using a cloud directory
        #[arg(long)]
        no_cloud_dir: bool,
        /// File stem of the cloud copy
        #[arg(long)]
        storage_key: Option<String>,
    },
}

pub fn run(command: Option<ConfigCommands>) -> Result<()> {
    let data_dir = get_data_dir()?;

    match command {
        Some(ConfigCommands::Set {
            device_name,
            cloud_dir,
            no_cloud_dir,
            storage_key,
        }) => {
            let mut config = Config::load_saved(&data_dir)?;
            let mut changed = false;

            if let Some(name) = device_name {
                config.device_name = non_blank("device name", name)?;
                changed = true;
            }
            if let Some(dir) = cloud_dir {
                config.cloud_dir = Some(dir);
                changed = true;
            }
            if no_cloud_dir {
                config.cloud_dir = None;
                changed = true;
            }
            if let Some(key) = storage_key {
                config.storage_key = non_blank("storage key", key)?;
                changed = true;
            }
            if !changed {
                bail!("Nothing to change. Pass --device-name, --cloud-dir, --no-cloud-dir or --storage-key");
            }

            config.save(&data_dir)?;
            output::success("Settings saved");
            show(&Config::load(&data_dir)?);
        }
        Some(ConfigCommands::Show) | None => show(&Config::load(&data_dir)?),
    }
    Ok(())
}

fn non_blank(label: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("The {} cannot be blank", label);
    }
    Ok(trimmed.to_string())
}

fn show(config: &Config) {
    println!("\n{}", "Settings".bold());
    println!("  Device name:  {}", config.device_name);
    match config.cloud_snapshot_path() {
        Some(path) => println!("  Cloud copy:   {}", path.display()),
        None => println!("  Cloud copy:   {}", "not configured".dimmed()),
    }
    println!("  Storage key:  {}", config.storage_key);
    if std::env::var_os(CLOUD_DIR_ENV).is_some_and(|d| !d.is_empty()) {
        output::info(&format!("  Cloud directory overridden by {}", CLOUD_DIR_ENV));
    }
    println!();
}
