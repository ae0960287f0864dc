use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use riptide::{
    cli::{Cli, Commands, VagrantCommand},
    common::command_utils,
    config::{self, Config},
    error::RiptideError,
    generator::{self, compose_gen, BuildOutcome, Directive, DirectivePayload, StackDefinition},
    request::{self, Dispatcher},
    vagrant::{self, NodeOutcome, VagrantContext},
};
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run() -> riptide::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    let config = config::load_config(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Dockerfile {
            output,
            from,
            directives,
            dry_run,
        } => handle_dockerfile(&config, output, from, directives, dry_run, quiet).await,
        Commands::Stackfile {
            definition,
            output,
            name,
            dry_run,
        } => handle_stackfile(&config, definition, output, name, dry_run, quiet).await,
        Commands::ImportStack { path } => handle_import_stack(&path),
        Commands::Vagrant { dir, command } => {
            let mut ctx = VagrantContext::from_config(&config.vagrant);
            if let Some(dir) = dir {
                ctx.working_dir = dir;
            }
            handle_vagrant(&ctx, command, quiet).await
        }
        Commands::Serve => {
            let dispatcher = Dispatcher::new(config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            request::serve(&dispatcher, stdin, tokio::io::stdout()).await
        }
    }
}

async fn handle_dockerfile(
    config: &Config,
    output: PathBuf,
    from: Option<PathBuf>,
    directives: Vec<(String, String)>,
    dry_run: bool,
    quiet: bool,
) -> riptide::Result<()> {
    let mut payload = match from {
        Some(path) => serde_json::from_str(&read_input(&path)?)?,
        None => DirectivePayload::new(),
    };

    for (keyword, value) in directives {
        let directive = Directive::from_key(&keyword)
            .ok_or_else(|| RiptideError::InvalidInput(format!("unknown directive '{}'", keyword)))?;
        payload.push_line(directive, &value);
    }

    if payload.is_empty() {
        return Err(RiptideError::InvalidInput(
            "no directives given; use --from or -d KEYWORD=VALUE".to_string(),
        ));
    }

    if dry_run {
        print!("{}", generator::generate_dockerfile(&payload, &config.generation));
        return Ok(());
    }

    report(generator::write_dockerfile(&output, &payload, &config.generation).await, quiet)
}

async fn handle_stackfile(
    config: &Config,
    definition: PathBuf,
    output: PathBuf,
    name: String,
    dry_run: bool,
    quiet: bool,
) -> riptide::Result<()> {
    let stack: StackDefinition = serde_yaml::from_str(&read_input(&definition)?)?;

    if dry_run {
        print!("{}", generator::generate_stackfile(&stack, &config.generation)?);
        return Ok(());
    }

    report(generator::write_stackfile(&output, &name, &stack, &config.generation).await, quiet)
}

fn handle_import_stack(path: &Path) -> riptide::Result<()> {
    let stack = compose_gen::parse_stackfile(&read_input(path)?)?;
    println!("{}", serde_json::to_string_pretty(&stack)?);
    Ok(())
}

async fn handle_vagrant(
    ctx: &VagrantContext,
    command: VagrantCommand,
    quiet: bool,
) -> riptide::Result<()> {
    match command {
        VagrantCommand::Status => {
            let status = serde_json::to_value(vagrant::status(ctx))?;
            println!("{}", status.as_str().unwrap_or_default());
            Ok(())
        }
        VagrantCommand::Up { payload } => {
            if !command_utils::is_command_available(&ctx.binary) {
                log::warn!("`{}` was not found in PATH", ctx.binary);
            }
            let payload = match payload {
                Some(path) => serde_json::from_str(&read_input(&path)?)?,
                None => serde_json::Value::Null,
            };
            let vagrantfile =
                with_spinner("Bringing machines up...", quiet, vagrant::prepare(ctx, &payload)).await?;
            if !quiet {
                println!("{} Machines are up ({})", "✅".green(), vagrantfile.display());
            }
            Ok(())
        }
        VagrantCommand::Reload { nodes } => {
            let outcomes = with_spinner("Reloading machines...", quiet, vagrant::reload(ctx, &nodes)).await?;
            report_nodes("reloaded", &outcomes, quiet)
        }
        VagrantCommand::Suspend { nodes } => {
            let outcomes = with_spinner("Suspending machines...", quiet, vagrant::suspend(ctx, &nodes)).await?;
            report_nodes("suspended", &outcomes, quiet)
        }
        VagrantCommand::Update { node, config } => {
            let values: serde_json::Value = serde_json::from_str(&read_input(&config)?)?;
            let outcome = with_spinner(
                "Updating machine...",
                quiet,
                vagrant::update_node(ctx, &node, &values),
            )
            .await?;
            report_nodes("updated", &[outcome], quiet)
        }
        VagrantCommand::Destroy { nodes } => {
            let outcomes = with_spinner("Destroying machines...", quiet, vagrant::destroy(ctx, &nodes)).await?;
            report_nodes("destroyed", &outcomes, quiet)
        }
    }
}

/// Read a file, or stdin when the path is `-`
fn read_input(path: &Path) -> riptide::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn report(outcome: BuildOutcome, quiet: bool) -> riptide::Result<()> {
    match outcome {
        BuildOutcome::Written(_) if quiet => Ok(()),
        BuildOutcome::Written(file) => {
            println!("{} {} generated in {}", "✅".green(), file.file_name.bold(), file.file_path.display());
            Ok(())
        }
        BuildOutcome::Skipped { reason } => {
            eprintln!("{} Nothing written: {}", "⚠️".yellow(), reason);
            process::exit(1);
        }
    }
}

fn report_nodes(action: &str, outcomes: &[NodeOutcome], quiet: bool) -> riptide::Result<()> {
    for outcome in outcomes {
        match &outcome.error {
            None if quiet => {}
            None => println!("{} {} {}", "✅".green(), outcome.node.bold(), action),
            Some(error) => eprintln!("{} {} {}", "❌".red(), outcome.node.bold(), error.red()),
        }
    }

    if vagrant::all_succeeded(outcomes) {
        Ok(())
    } else {
        process::exit(1);
    }
}

/// Show a spinner while `task` runs, unless output is quiet or logs are being printed
async fn with_spinner<T>(message: &str, quiet: bool, task: impl Future<Output = T>) -> T {
    if quiet || log::max_level() >= log::LevelFilter::Info {
        return task.await;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = task.await;
    pb.finish_and_clear();
    result
}
