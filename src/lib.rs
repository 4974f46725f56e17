//! Staged generation, storage and transmission expansion planning.
//!
//! A case is loaded into a [`model::Model`], formulated one stage at a time and solved by the
//! [`simulation::StageController`]. Results are written by the extractors in [`output`].
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod example;
pub mod formulation;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod settings;
pub mod simulation;
pub mod solver;
pub mod subset;
pub mod system;
pub mod toggle;
pub mod units;
pub mod universe;
pub mod weights;

#[cfg(test)]
mod fixture;

/// URL for the project's issue tracker
pub const ISSUES_URL: &str = "https://github.com/tepes-model/tepes/issues";

/// Get the path to the directory in which program configuration is stored
pub fn get_tepes_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir available on this platform, so use the current directory instead
        return PathBuf::default();
    };
    config_dir.push("tepes");
    config_dir
}
