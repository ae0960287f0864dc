use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiptideError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GeneratorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Vagrant error: {0}")]
    Vagrant(#[from] VagrantError),

    #[error("Destination is not writable: {path}")]
    DestinationUnwritable { path: PathBuf },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Template rendering failed: {0}")]
    TemplateRendering(String),

    #[error("Template not found: {path}")]
    TemplateMissing { path: PathBuf },

    #[error("Invalid stack file: {0}")]
    InvalidStackfile(String),

    #[error("Invalid directive payload: {0}")]
    InvalidPayload(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Configuration parsing failed: {0}")]
    ParsingFailed(String),
}

#[derive(Error, Debug)]
pub enum VagrantError {
    #[error("Vagrantfile not found in {dir}")]
    MissingVagrantfile { dir: PathBuf },

    #[error("Failed to launch `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },
}

impl From<tera::Error> for GeneratorError {
    fn from(err: tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        GeneratorError::TemplateRendering(message)
    }
}

pub type Result<T> = std::result::Result<T, RiptideError>;
