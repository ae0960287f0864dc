//! # Vagrant driver
//!
//! Thin wrapper around the `vagrant` CLI. Every operation receives a
//! [`VagrantContext`] naming the working directory and binary to use; nothing
//! is kept in process-wide state.
//!
//! Per-node operations run with bounded concurrency and report one
//! [`NodeOutcome`] per node, in the order the nodes were given.

use crate::common::{command_utils, file_utils};
use crate::config::VagrantConfig;
use crate::error::{Result, VagrantError};
use crate::generator::vagrant_gen::{self, CUSTOMFILE, VAGRANTFILE};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Where and how to run vagrant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VagrantContext {
    /// Holds the templates and the generated `Vagrantfile`
    pub working_dir: PathBuf,
    pub binary: String,
    pub max_concurrency: usize,
    pub auto_start_swarm: bool,
    pub env: Vec<(String, String)>,
}

impl VagrantContext {
    pub fn from_config(config: &VagrantConfig) -> Self {
        Self {
            working_dir: config.templates_dir.clone(),
            binary: config.binary.clone(),
            max_concurrency: config.effective_concurrency(),
            auto_start_swarm: config.auto_start_swarm,
            env: Vec::new(),
        }
    }

    pub fn vagrantfile(&self) -> PathBuf {
        self.working_dir.join(VAGRANTFILE)
    }

    fn require_vagrantfile(&self) -> Result<()> {
        if file_utils::is_readable_file(&self.vagrantfile()) {
            Ok(())
        } else {
            Err(VagrantError::MissingVagrantfile {
                dir: self.working_dir.clone(),
            }
            .into())
        }
    }
}

/// Per-node vagrant subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Reload,
    Suspend,
    Destroy,
}

impl NodeAction {
    fn args(self, node: &str) -> Vec<&str> {
        match self {
            NodeAction::Reload => vec!["reload", node],
            NodeAction::Suspend => vec!["suspend", node],
            NodeAction::Destroy => vec!["destroy", "--force", node],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeOutcome {
    pub node: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeOutcome {
    fn from_result(node: String, result: std::result::Result<(), VagrantError>) -> Self {
        match result {
            Ok(()) => Self {
                node,
                success: true,
                error: None,
            },
            Err(e) => {
                warn!("{}: {}", node, e);
                Self {
                    node,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// True when every node succeeded
pub fn all_succeeded(outcomes: &[NodeOutcome]) -> bool {
    outcomes.iter().all(|outcome| outcome.success)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Paused,
    Stopped,
}

/// `paused` while a generated Vagrantfile exists, `stopped` otherwise
pub fn status(ctx: &VagrantContext) -> MachineStatus {
    if file_utils::is_readable_file(&ctx.vagrantfile()) {
        MachineStatus::Paused
    } else {
        MachineStatus::Stopped
    }
}

/// Render the Vagrantfile from `payload` and bring the machines up
pub async fn prepare(ctx: &VagrantContext, payload: &Value) -> Result<PathBuf> {
    let template = vagrant_gen::template_path(&ctx.working_dir, VAGRANTFILE);
    let settings = vagrant_gen::render_file(&template, payload)?;
    let vagrantfile = ctx.vagrantfile();
    file_utils::write_file(&vagrantfile, &settings).await?;

    let mut env = ctx.env.clone();
    if ctx.auto_start_swarm {
        env.push(("AUTO_START_SWARM".to_string(), "true".to_string()));
    }
    info!("Starting machines from {}", vagrantfile.display());
    run(ctx, &["up"], &env).await?;

    Ok(vagrantfile)
}

pub async fn reload(ctx: &VagrantContext, nodes: &[String]) -> Result<Vec<NodeOutcome>> {
    ctx.require_vagrantfile()?;
    Ok(fan_out(ctx, nodes, NodeAction::Reload).await)
}

pub async fn suspend(ctx: &VagrantContext, nodes: &[String]) -> Result<Vec<NodeOutcome>> {
    ctx.require_vagrantfile()?;
    Ok(fan_out(ctx, nodes, NodeAction::Suspend).await)
}

/// Apply per-node overrides from `config` through a temporary Customfile and
/// reload the node. The Customfile is removed whatever the reload result.
pub async fn update_node(ctx: &VagrantContext, node: &str, config: &Value) -> Result<NodeOutcome> {
    ctx.require_vagrantfile()?;

    let mut values = match config {
        Value::Object(values) => values.clone(),
        _ => serde_json::Map::new(),
    };
    values.insert("node".to_string(), Value::from(node));

    let template = vagrant_gen::template_path(&ctx.working_dir, CUSTOMFILE);
    let overrides = vagrant_gen::render_file(&template, &Value::Object(values))?;
    let customfile = ctx.working_dir.join(CUSTOMFILE);
    file_utils::write_file(&customfile, &overrides).await?;

    let result = run(ctx, &NodeAction::Reload.args(node), &ctx.env).await;
    file_utils::delete_file(&customfile).await?;

    Ok(NodeOutcome::from_result(node.to_string(), result))
}

/// Destroy every node, then remove the generated Vagrantfile
pub async fn destroy(ctx: &VagrantContext, nodes: &[String]) -> Result<Vec<NodeOutcome>> {
    ctx.require_vagrantfile()?;
    let outcomes = fan_out(ctx, nodes, NodeAction::Destroy).await;
    file_utils::delete_file(&ctx.vagrantfile()).await?;
    Ok(outcomes)
}

async fn fan_out(ctx: &VagrantContext, nodes: &[String], action: NodeAction) -> Vec<NodeOutcome> {
    let limit = ctx.max_concurrency.max(1);
    debug!("{:?} {} node(s), {} at a time", action, nodes.len(), limit);

    stream::iter(nodes.iter().cloned())
        .map(|node| async move {
            let result = run(ctx, &action.args(&node), &ctx.env).await;
            NodeOutcome::from_result(node, result)
        })
        .buffered(limit)
        .collect()
        .await
}

async fn run(
    ctx: &VagrantContext,
    args: &[&str],
    env: &[(String, String)],
) -> std::result::Result<(), VagrantError> {
    let command = format!("{} {}", ctx.binary, args.join(" "));
    let output = command_utils::execute_command(&ctx.binary, args, &ctx.working_dir, env)
        .await
        .map_err(|e| VagrantError::Spawn {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(VagrantError::CommandFailed {
            command,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::RiptideError;
    use serde_json::json;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// A fake vagrant that logs its arguments and fails for nodes named `broken`
    fn fake_vagrant(dir: &TempDir) -> VagrantContext {
        let script = dir.path().join("fake-vagrant");
        fs::write(
            &script,
            "#!/bin/sh\necho \"$@\" >> calls.log\ncase \"$*\" in *broken*) echo boom >&2; exit 3;; esac\nexit 0\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        VagrantContext {
            working_dir: dir.path().to_path_buf(),
            binary: script.to_string_lossy().into_owned(),
            max_concurrency: 2,
            auto_start_swarm: true,
            env: Vec::new(),
        }
    }

    fn calls(dir: &TempDir) -> Vec<String> {
        fs::read_to_string(dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_status_follows_vagrantfile() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);
        assert_eq!(status(&ctx), MachineStatus::Stopped);

        fs::write(ctx.vagrantfile(), "").unwrap();
        assert_eq!(status(&ctx), MachineStatus::Paused);
    }

    #[tokio::test]
    async fn test_reload_requires_vagrantfile() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);

        let err = reload(&ctx, &nodes(&["manager1"])).await.unwrap_err();
        assert!(matches!(
            err,
            RiptideError::Vagrant(VagrantError::MissingVagrantfile { .. })
        ));
        assert!(calls(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_reports_each_node_in_order() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);
        fs::write(ctx.vagrantfile(), "").unwrap();

        let outcomes = suspend(&ctx, &nodes(&["manager1", "broken", "worker1"]))
            .await
            .unwrap();

        let names: Vec<_> = outcomes.iter().map(|o| o.node.as_str()).collect();
        assert_eq!(names, vec!["manager1", "broken", "worker1"]);
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[1].error.as_deref().unwrap().contains("boom"));
        assert!(outcomes[2].success);
        assert!(!all_succeeded(&outcomes));

        let mut logged = calls(&dir);
        logged.sort();
        assert_eq!(
            logged,
            vec!["suspend broken", "suspend manager1", "suspend worker1"]
        );
    }

    #[tokio::test]
    async fn test_empty_node_list() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);
        fs::write(ctx.vagrantfile(), "").unwrap();

        let outcomes = reload(&ctx, &[]).await.unwrap();
        assert!(outcomes.is_empty());
        assert!(all_succeeded(&outcomes));
    }

    #[tokio::test]
    async fn test_destroy_removes_vagrantfile() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);
        fs::write(ctx.vagrantfile(), "").unwrap();

        let outcomes = destroy(&ctx, &nodes(&["worker1"])).await.unwrap();
        assert!(all_succeeded(&outcomes));
        assert_eq!(calls(&dir), vec!["destroy --force worker1"]);
        assert_eq!(status(&ctx), MachineStatus::Stopped);
    }

    #[tokio::test]
    async fn test_prepare_renders_and_starts() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);
        fs::write(
            dir.path().join("Vagrantfile.tpl"),
            "box={{ box }} swarm={{ swarm }}",
        )
        .unwrap();

        let vagrantfile = prepare(&ctx, &json!({ "box": "bento/debian-12", "swarm": true }))
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(vagrantfile).unwrap(),
            "box=bento/debian-12 swarm=true"
        );
        assert_eq!(calls(&dir), vec!["up"]);
    }

    #[tokio::test]
    async fn test_prepare_without_template() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);

        assert!(prepare(&ctx, &json!({})).await.is_err());
        assert!(calls(&dir).is_empty());
        assert_eq!(status(&ctx), MachineStatus::Stopped);
    }

    #[tokio::test]
    async fn test_update_node_cleans_up_customfile() {
        let dir = TempDir::new().unwrap();
        let ctx = fake_vagrant(&dir);
        fs::write(ctx.vagrantfile(), "").unwrap();
        fs::write(dir.path().join("Customfile.tpl"), "{{ node }} {{ memory }}").unwrap();

        let outcome = update_node(&ctx, "worker1", &json!({ "memory": 4096 }))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(calls(&dir), vec!["reload worker1"]);
        assert!(!dir.path().join("Customfile").exists());
    }

    #[test]
    fn test_node_outcome_wire_format() {
        let ok = NodeOutcome::from_result("a".to_string(), Ok(()));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "node": "a", "success": true })
        );
    }
}
