//! The CLI commands for interacting with the settings file.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::Result;
use clap::Subcommand;

/// The available subcommands for managing the settings file.
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Show the default settings, with their documentation.
    ShowDefault,
    /// Show the path to the settings file.
    Path,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::ShowDefault => print!("{}", Settings::default_file_contents()),
            Self::Path => handle_settings_path_command(),
        }

        Ok(())
    }
}

/// Handle the `settings path` command.
fn handle_settings_path_command() {
    let file_path = get_settings_file_path();
    if file_path.is_file() {
        println!("{}", file_path.display());
    } else {
        println!("{} (not present)", file_path.display());
    }
}
