use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Attribution line written at the top of every generated file
pub const DEFAULT_HEADER: &str = "# Generated by Riptide https://github.com/Spring3/riptide ";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub vagrant: VagrantConfig,
}

/// Dockerfile and stack file generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// First line of every generated file, without the trailing newline
    pub header: String,
    /// Value of the `version:` key in stack files
    pub compose_version: String,
    pub dockerfile_name: String,
    /// Emit `ENTRYPOINT`/`STOPSIGNAL` instead of the two-word forms
    pub docker_keywords: bool,
}

/// Vagrant provisioning configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VagrantConfig {
    pub binary: String,
    /// Directory holding `Vagrantfile.tpl` and `Customfile.tpl`; also the
    /// working directory for every vagrant invocation
    pub templates_dir: PathBuf,
    /// Upper bound on per-node commands running at once (0 = CPU count)
    pub max_concurrency: usize,
    pub auto_start_swarm: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            compose_version: "3".to_string(),
            dockerfile_name: "Dockerfile".to_string(),
            docker_keywords: false,
        }
    }
}

impl Default for VagrantConfig {
    fn default() -> Self {
        Self {
            binary: "vagrant".to_string(),
            templates_dir: PathBuf::from("templates"),
            max_concurrency: 0,
            auto_start_swarm: true,
        }
    }
}

impl VagrantConfig {
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrency == 0 {
            num_cpus::get().max(1)
        } else {
            self.max_concurrency
        }
    }
}
