//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing and subcommand handlers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction, OutputArgs, SettingsArgs};
pub use commands::{
    effective_layout, effective_settings, handle_config_action, load_config, run_encode,
    run_preview,
};
