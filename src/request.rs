//! # Request protocol
//!
//! Line-delimited JSON messages of the form `{ "channel": ..., "data": ... }`.
//! Each request on channel `x` is answered, when it is answered at all, on
//! channel `x:rs`. Requests are handled one at a time.
//!
//! | Channel | `data.type` | Other fields | Reply |
//! |---|---|---|---|
//! | `build` | `DOCKERFILE` | `destination`, `payload` | `{fileName, filePath}` or `{}` |
//! | `build` | `STACKFILE` | `destination`, `filename`, `stackfile` | same |
//! | `build` | `VAGRANTFILE` | `payload` | same |
//! | `stop`, `reload`, `destroy` | `VAGRANT` | `nodes` | `true` / `false` |
//! | `update` | `VAGRANT` | `node`, `config` | `true` / `false` |
//! | `vagrantStatus` | | | `"paused"` / `"stopped"` |
//!
//! A `build` whose payload or stack definition cannot be decoded is answered
//! with `{}`, like any other generation failure. Unknown types, malformed
//! envelopes and Vagrant failures are logged and get no reply.

use crate::config::Config;
use crate::error::{Result, RiptideError};
use crate::generator::{self, BuildOutcome, DirectivePayload, GeneratedFile, StackDefinition};
use crate::vagrant::{self, VagrantContext};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub channel: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildRequest {
    Dockerfile {
        destination: Option<PathBuf>,
        payload: Value,
    },
    Stackfile {
        destination: Option<PathBuf>,
        filename: Option<String>,
        stackfile: Value,
    },
    Vagrantfile {
        payload: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Build(BuildRequest),
    Stop { nodes: Vec<String> },
    Reload { nodes: Vec<String> },
    Destroy { nodes: Vec<String> },
    Update { node: String, config: Value },
    VagrantStatus,
}

impl Request {
    pub fn parse(envelope: &Envelope) -> Result<Request> {
        let data = &envelope.data;
        if envelope.channel == "vagrantStatus" {
            return Ok(Request::VagrantStatus);
        }

        let kind = data
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RiptideError::InvalidInput("missing request type".to_string()))?
            .to_uppercase();

        match (envelope.channel.as_str(), kind.as_str()) {
            ("build", "DOCKERFILE") => Ok(Request::Build(BuildRequest::Dockerfile {
                destination: optional_path(data, "destination"),
                payload: data.get("payload").cloned().unwrap_or(Value::Null),
            })),
            ("build", "STACKFILE") => Ok(Request::Build(BuildRequest::Stackfile {
                destination: optional_path(data, "destination"),
                filename: data.get("filename").and_then(Value::as_str).map(str::to_string),
                stackfile: data.get("stackfile").cloned().unwrap_or(Value::Null),
            })),
            ("build", "VAGRANTFILE") => Ok(Request::Build(BuildRequest::Vagrantfile {
                payload: data.get("payload").cloned().unwrap_or(Value::Null),
            })),
            ("stop", "VAGRANT") => Ok(Request::Stop {
                nodes: node_list(data)?,
            }),
            ("reload", "VAGRANT") => Ok(Request::Reload {
                nodes: node_list(data)?,
            }),
            ("destroy", "VAGRANT") => Ok(Request::Destroy {
                nodes: node_list(data)?,
            }),
            ("update", "VAGRANT") => {
                let node = data
                    .get("node")
                    .and_then(Value::as_str)
                    .filter(|node| !node.is_empty())
                    .ok_or_else(|| RiptideError::InvalidInput("missing node".to_string()))?;
                let config = match data.get("config") {
                    Some(config @ Value::Object(_)) => config.clone(),
                    _ => return Err(RiptideError::InvalidInput("missing node config".to_string())),
                };
                Ok(Request::Update {
                    node: node.to_string(),
                    config,
                })
            }
            (channel, kind) => Err(RiptideError::UnsupportedType(format!(
                "{} on channel '{}'",
                kind, channel
            ))),
        }
    }
}

fn optional_path(data: &Value, key: &str) -> Option<PathBuf> {
    data.get(key).and_then(Value::as_str).map(PathBuf::from)
}

fn node_list(data: &Value) -> Result<Vec<String>> {
    let Some(Value::Array(nodes)) = data.get("nodes") else {
        return Err(RiptideError::InvalidInput("nodes must be a list".to_string()));
    };

    nodes
        .iter()
        .map(|node| {
            node.as_str()
                .map(str::to_string)
                .ok_or_else(|| RiptideError::InvalidInput(format!("invalid node name {}", node)))
        })
        .collect()
}

/// Routes requests to the generators and the Vagrant driver
pub struct Dispatcher {
    config: Config,
    vagrant: VagrantContext,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        let vagrant = VagrantContext::from_config(&config.vagrant);
        Self { config, vagrant }
    }

    pub fn with_vagrant(config: Config, vagrant: VagrantContext) -> Self {
        Self { config, vagrant }
    }

    /// Handle one envelope. `None` means no reply is sent.
    pub async fn dispatch(&self, envelope: Envelope) -> Option<Envelope> {
        let request = match Request::parse(&envelope) {
            Ok(request) => request,
            Err(e) => {
                error!("Rejected '{}' request: {}", envelope.channel, e);
                return None;
            }
        };

        match self.handle(request).await {
            Ok(data) => Some(Envelope {
                channel: format!("{}:rs", envelope.channel),
                data,
            }),
            Err(e) => {
                error!("'{}' request failed: {}", envelope.channel, e);
                None
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Result<Value> {
        let generation = &self.config.generation;
        match request {
            Request::Build(BuildRequest::Dockerfile {
                destination,
                payload,
            }) => {
                let outcome = match (destination, DirectivePayload::from_json(&payload)) {
                    (None, _) => missing_destination(),
                    (Some(_), Err(e)) => undecodable("directive payload", e),
                    (Some(destination), Ok(payload)) => {
                        generator::write_dockerfile(&destination, &payload, generation).await
                    }
                };
                Ok(serde_json::to_value(outcome)?)
            }
            Request::Build(BuildRequest::Stackfile {
                destination,
                filename,
                stackfile,
            }) => {
                let outcome = match (destination, filename, decode_stack(stackfile)) {
                    (Some(_), Some(_), Err(e)) => undecodable("stack definition", e),
                    (Some(destination), Some(filename), Ok(stackfile)) => {
                        generator::write_stackfile(&destination, &filename, &stackfile, generation)
                            .await
                    }
                    _ => missing_destination(),
                };
                Ok(serde_json::to_value(outcome)?)
            }
            Request::Build(BuildRequest::Vagrantfile { payload }) => {
                let vagrantfile = vagrant::prepare(&self.vagrant, &payload).await?;
                info!("Machines started from {}", vagrantfile.display());
                let outcome = BuildOutcome::Written(GeneratedFile {
                    file_name: crate::generator::vagrant_gen::VAGRANTFILE.to_string(),
                    file_path: self.vagrant.working_dir.clone(),
                });
                Ok(serde_json::to_value(outcome)?)
            }
            Request::Stop { nodes } => {
                let outcomes = vagrant::suspend(&self.vagrant, &nodes).await?;
                debug!("suspend: {}", serde_json::to_string(&outcomes)?);
                Ok(Value::Bool(vagrant::all_succeeded(&outcomes)))
            }
            Request::Reload { nodes } => {
                let outcomes = vagrant::reload(&self.vagrant, &nodes).await?;
                debug!("reload: {}", serde_json::to_string(&outcomes)?);
                Ok(Value::Bool(vagrant::all_succeeded(&outcomes)))
            }
            Request::Destroy { nodes } => {
                let outcomes = vagrant::destroy(&self.vagrant, &nodes).await?;
                debug!("destroy: {}", serde_json::to_string(&outcomes)?);
                Ok(Value::Bool(vagrant::all_succeeded(&outcomes)))
            }
            Request::Update { node, config } => {
                let outcome = vagrant::update_node(&self.vagrant, &node, &config).await?;
                Ok(Value::Bool(outcome.success))
            }
            Request::VagrantStatus => Ok(serde_json::to_value(vagrant::status(&self.vagrant))?),
        }
    }
}

fn missing_destination() -> BuildOutcome {
    BuildOutcome::Skipped {
        reason: "no destination given".to_string(),
    }
}

fn undecodable(what: &str, e: RiptideError) -> BuildOutcome {
    warn!("Skipped build with invalid {}: {}", what, e);
    BuildOutcome::Skipped {
        reason: format!("invalid {}: {}", what, e),
    }
}

fn decode_stack(stackfile: Value) -> Result<StackDefinition> {
    match stackfile {
        Value::Null => Ok(StackDefinition::default()),
        other => Ok(serde_json::from_value(other)?),
    }
}

/// Read envelopes line by line and write replies as they are produced
pub async fn serve<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope: Envelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Ignoring malformed request: {}", e);
                continue;
            }
        };

        if let Some(reply) = dispatcher.dispatch(envelope).await {
            let mut encoded = serde_json::to_string(&reply)?;
            encoded.push('\n');
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
        }
    }
    Ok(())
}
