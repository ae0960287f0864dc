use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "riptide")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assemble Dockerfiles, stack files and Vagrant machines from plain input")]
#[command(long_about = "Builds Dockerfiles and Docker stack files from directive and entity definitions, and drives Vagrant to provision swarm machines. `riptide serve` exposes the same operations over line-delimited JSON on stdin/stdout.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "RIPTIDE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a Dockerfile
    Dockerfile {
        /// Directory the Dockerfile is written to
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// JSON object of directive -> text ("-" reads stdin)
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Directive as KEYWORD=VALUE; repeat a keyword to add lines
        #[arg(short = 'd', long = "directive", value_name = "KEYWORD=VALUE", value_parser = parse_directive)]
        directives: Vec<(String, String)>,

        /// Print the Dockerfile instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a stack file from volume, network and service definitions
    Stackfile {
        /// JSON or YAML file with `volumes`, `networks` and `services` lists ("-" reads stdin)
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,

        /// Directory the stack file is written to
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// File name of the stack file
        #[arg(short, long, default_value = "docker-stack.yml")]
        name: String,

        /// Print the stack file instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Read an existing stack file and print its entity lists as JSON
    ImportStack {
        #[arg(value_name = "STACKFILE")]
        path: PathBuf,
    },

    /// Provision and manage Vagrant machines
    Vagrant {
        /// Directory with the templates and generated Vagrantfile (overrides configuration)
        #[arg(long, global = true, value_name = "DIR")]
        dir: Option<PathBuf>,

        #[command(subcommand)]
        command: VagrantCommand,
    },

    /// Answer JSON requests from stdin, one per line
    Serve,
}

#[derive(Subcommand)]
pub enum VagrantCommand {
    /// Render the Vagrantfile and bring all machines up
    Up {
        /// JSON values for the Vagrantfile template
        #[arg(value_name = "PAYLOAD")]
        payload: Option<PathBuf>,
    },

    /// Reload machines
    Reload {
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Suspend machines
    Suspend {
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Apply resource overrides to one machine and reload it
    Update {
        node: String,

        /// JSON values for the Customfile template
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Destroy machines and remove the generated Vagrantfile
    Destroy {
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Show whether a generated Vagrantfile is present
    Status,
}

fn parse_directive(raw: &str) -> Result<(String, String), String> {
    let (keyword, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEYWORD=VALUE, got '{}'", raw))?;
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(format!("missing keyword in '{}'", raw));
    }
    Ok((keyword.to_string(), value.to_string()))
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_directive() {
        assert_eq!(
            parse_directive("ENV=NODE_ENV=production").unwrap(),
            ("ENV".to_string(), "NODE_ENV=production".to_string())
        );
        assert_eq!(
            parse_directive("ENTRY POINT=/entry.sh").unwrap(),
            ("ENTRY POINT".to_string(), "/entry.sh".to_string())
        );
        assert!(parse_directive("FROM alpine").is_err());
        assert!(parse_directive("=alpine").is_err());
    }

    #[test]
    fn test_repeated_directives() {
        let cli = Cli::try_parse_from([
            "riptide", "dockerfile", "-d", "FROM=alpine", "-d", "RUN=apk add git", "-d", "RUN=apk add curl",
        ])
        .unwrap();
        match cli.command {
            Commands::Dockerfile { directives, .. } => assert_eq!(directives.len(), 3),
            _ => panic!("expected dockerfile command"),
        }
    }
}
