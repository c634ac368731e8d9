//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing, subcommand handlers and the
//! line commands of the interactive loop.

mod args;
mod commands;
mod control;

pub use args::{Args, Command, ConfigAction};
pub use commands::{handle_config_action, list_cameras};
pub use control::{ControlCommand, UnknownCommand, HELP};
