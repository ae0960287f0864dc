//! Rendering of the Vagrant provisioning templates with `tera`.

use crate::error::{GeneratorError, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

pub const VAGRANTFILE: &str = "Vagrantfile";
pub const CUSTOMFILE: &str = "Customfile";

/// `<dir>/<name>.tpl`
pub fn template_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.tpl", name))
}

/// Render a template string with a JSON object as context
pub fn render(template: &str, values: &Value) -> Result<String> {
    let context = match values {
        Value::Null => Context::new(),
        other => Context::from_value(other.clone()).map_err(GeneratorError::from)?,
    };

    Tera::one_off(template, &context, false)
        .map_err(|e| GeneratorError::from(e).into())
}

/// Render the template file at `path`
pub fn render_file(path: &Path, values: &Value) -> Result<String> {
    if !path.is_file() {
        return Err(GeneratorError::TemplateMissing {
            path: path.to_path_buf(),
        }
        .into());
    }
    let template = fs::read_to_string(path)?;
    render(&template, values)
}
