//! Subcommand handlers for list-cameras and config actions.

use std::path::Path;

use super::args::ConfigAction;
use crate::camera::{self, BackendKind, CameraError};
use crate::config::{self, Config, ConfigError};

/// List available cameras and print them to stdout.
pub fn list_cameras(kind: BackendKind) -> Result<(), CameraError> {
    let devices = camera::backend_for(kind)?.list_devices()?;

    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and permissions are granted.");
    } else {
        println!("Available cameras ({} backend):", kind.name());
        for device in devices {
            println!("  {}", device);
        }
        println!();
        println!("Use --camera <index> to select a camera.");
    }
    Ok(())
}

/// Handle config subcommand actions.
///
/// `show` prints the effective configuration (file, environment and flags
/// merged). `init` writes the commented default file.
pub fn handle_config_action(
    action: ConfigAction,
    path: Option<&Path>,
    effective: &Config,
) -> Result<(), ConfigError> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(config::default_path);

    match action {
        ConfigAction::Show => {
            println!("# Effective configuration");
            if config_path.exists() {
                println!("# Config file: {} (exists)", config_path.display());
            } else {
                println!("# Config file: {} (not found)", config_path.display());
            }
            println!();
            print!("{}", effective.to_toml()?);
        }
        ConfigAction::Init => {
            config::init_at(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_synthetic_cameras() {
        assert!(list_cameras(BackendKind::Synthetic).is_ok());
    }

    #[test]
    fn test_config_init_then_show() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        handle_config_action(ConfigAction::Init, Some(&path), &Config::default()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            config::DEFAULT_CONFIG_TEMPLATE
        );
        handle_config_action(ConfigAction::Show, Some(&path), &Config::default()).unwrap();

        let again = handle_config_action(ConfigAction::Init, Some(&path), &Config::default());
        assert!(matches!(again, Err(ConfigError::AlreadyExists(_))));
    }
}
