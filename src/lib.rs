//! # Riptide
//!
//! Builds container artifacts from plain key/value input: Dockerfiles from a
//! directive payload, Docker stack files from lists of named volumes, networks
//! and services, and Vagrant provisioning files from templates. The Vagrant
//! CLI can then be driven to bring machines up, reload, suspend, update or
//! destroy them.
//!
//! ## Example
//!
//! ```rust
//! use riptide::config::GenerationConfig;
//! use riptide::generator::{generate_dockerfile, Directive, DirectivePayload};
//!
//! let mut payload = DirectivePayload::new();
//! payload
//!     .insert(Directive::Cmd, "node server.js")
//!     .insert(Directive::From, "node:20-alpine")
//!     .insert(Directive::Expose, "EXPOSE 8080");
//!
//! let dockerfile = generate_dockerfile(&payload, &GenerationConfig::default());
//! assert!(dockerfile.ends_with(
//!     "FROM node:20-alpine\n\nEXPOSE 8080\n\nCMD [\"node\", \"server.js\"]\n\n"
//! ));
//! ```

pub mod cli;
pub mod common;
pub mod config;
pub mod error;
pub mod generator;
pub mod request;
pub mod vagrant;

// Re-export commonly used types and functions
pub use error::{Result, RiptideError};
pub use generator::{
    generate_dockerfile, generate_stackfile, write_dockerfile, write_stackfile, BuildOutcome,
    GeneratedFile,
};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
