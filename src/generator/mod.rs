use crate::common::file_utils;
use crate::config::GenerationConfig;
use crate::error::Result;
use log::{info, warn};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

pub mod command;
pub mod compose_gen;
pub mod dockerfile_gen;
pub mod vagrant_gen;

pub use compose_gen::{NamedEntity, StackDefinition};
pub use dockerfile_gen::{Directive, DirectivePayload};

/// Name and directory of a file that was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    pub file_name: String,
    pub file_path: PathBuf,
}

impl GeneratedFile {
    pub fn full_path(&self) -> PathBuf {
        self.file_path.join(&self.file_name)
    }
}

/// Result of a generate-and-write request.
///
/// Serializes as `{ "fileName", "filePath" }` when written and as `{}` when
/// skipped, which is what callers of the request protocol check for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Written(GeneratedFile),
    Skipped { reason: String },
}

impl BuildOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, BuildOutcome::Written(_))
    }

    pub fn file(&self) -> Option<&GeneratedFile> {
        match self {
            BuildOutcome::Written(file) => Some(file),
            BuildOutcome::Skipped { .. } => None,
        }
    }
}

impl Serialize for BuildOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BuildOutcome::Written(file) => file.serialize(serializer),
            BuildOutcome::Skipped { .. } => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// Generate a Dockerfile
pub fn generate_dockerfile(payload: &DirectivePayload, config: &GenerationConfig) -> String {
    dockerfile_gen::generate(payload, config)
}

/// Generate a stack file
pub fn generate_stackfile(stack: &StackDefinition, config: &GenerationConfig) -> Result<String> {
    compose_gen::generate(stack, config)
}

/// Generate a Dockerfile and write it into `destination`
pub async fn write_dockerfile(
    destination: &Path,
    payload: &DirectivePayload,
    config: &GenerationConfig,
) -> BuildOutcome {
    let content = generate_dockerfile(payload, config);
    persist(destination, &config.dockerfile_name, Ok(content)).await
}

/// Generate a stack file and write it into `destination` as `filename`
pub async fn write_stackfile(
    destination: &Path,
    filename: &str,
    stack: &StackDefinition,
    config: &GenerationConfig,
) -> BuildOutcome {
    persist(destination, filename, generate_stackfile(stack, config)).await
}

async fn persist(destination: &Path, file_name: &str, content: Result<String>) -> BuildOutcome {
    match try_persist(destination, file_name, content).await {
        Ok(file) => {
            info!("Generated {}", file.full_path().display());
            BuildOutcome::Written(file)
        }
        Err(e) => {
            warn!("Skipped writing {}: {}", file_name, e);
            BuildOutcome::Skipped {
                reason: e.to_string(),
            }
        }
    }
}

async fn try_persist(
    destination: &Path,
    file_name: &str,
    content: Result<String>,
) -> Result<GeneratedFile> {
    let directory = file_utils::check_destination(destination)?;
    let content = content?;
    file_utils::write_file(&directory.join(file_name), &content).await?;

    Ok(GeneratedFile {
        file_name: file_name.to_string(),
        file_path: destination.to_path_buf(),
    })
}
