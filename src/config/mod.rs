pub mod types;

use crate::error::{ConfigError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub use types::{Config, GenerationConfig, VagrantConfig};

/// Load configuration from file or use defaults.
///
/// An explicit path must exist. Without one, the per-user file under the
/// platform config directory is used when present.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::InvalidFile(format!(
                    "{} does not exist or is not a file",
                    path.display()
                ))
                .into());
            }
            read_config(path)
        }
        None => match default_config_path() {
            Some(path) if path.is_file() => read_config(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Config::default())
            }
        },
    }
}

/// `<config_dir>/riptide/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("riptide").join("config.toml"))
}

fn read_config(path: &Path) -> Result<Config> {
    debug!("Loading configuration from {}", path.display());
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| ConfigError::ParsingFailed(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [generation]
            compose_version = "3.8"

            [vagrant]
            max_concurrency = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.generation.compose_version, "3.8");
        assert_eq!(config.generation.dockerfile_name, "Dockerfile");
        assert!(!config.generation.docker_keywords);
        assert_eq!(config.vagrant.max_concurrency, 2);
        assert_eq!(config.vagrant.binary, "vagrant");
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_config() {
        assert!(parse_config("[generation\nheader = 1").is_err());
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("riptide.toml");
        fs::write(&path, "[vagrant]\nbinary = \"/opt/vagrant/bin/vagrant\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.vagrant.binary, "/opt/vagrant/bin/vagrant");
    }

    #[test]
    fn test_zero_concurrency_uses_cpus() {
        let config = VagrantConfig::default();
        assert!(config.effective_concurrency() >= 1);
    }
}
