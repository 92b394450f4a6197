//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Name of the service database file inside the root folder
pub const DATABASE_FILE: &str = "taxsync.db";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Ensure the root folder exists, creating it if missing, and return the
/// database path inside it.
pub fn prepare_root_folder(root: &PathBuf) -> Result<PathBuf> {
    std::fs::create_dir_all(root)
        .map_err(|e| Error::Config(format!("Failed to create root folder {:?}: {}", root, e)))?;
    Ok(root.join(DATABASE_FILE))
}

/// Get configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("taxsync").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/taxsync/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("taxsync"))
        .unwrap_or_else(|| PathBuf::from("./taxsync_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let resolved = resolve_root_folder(Some("/tmp/explicit"), "TAXSYNC_TEST_UNSET_VAR");
        assert_eq!(resolved, PathBuf::from("/tmp/explicit"));
    }

    #[test]
    fn test_env_var_second() {
        std::env::set_var("TAXSYNC_TEST_ROOT_VAR", "/tmp/from-env");
        let resolved = resolve_root_folder(None, "TAXSYNC_TEST_ROOT_VAR");
        assert_eq!(resolved, PathBuf::from("/tmp/from-env"));
        std::env::remove_var("TAXSYNC_TEST_ROOT_VAR");
    }

    #[test]
    fn test_prepare_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("root");
        let db_path = prepare_root_folder(&root).unwrap();
        assert!(root.is_dir());
        assert!(db_path.ends_with(DATABASE_FILE));
    }
}
