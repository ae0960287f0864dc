use std::path::Path;
use std::process::{Command, Output};

/// Run a command to completion in `cwd` with extra environment variables
pub async fn execute_command(
    cmd: &str,
    args: &[&str],
    cwd: &Path,
    envs: &[(String, String)],
) -> std::io::Result<Output> {
    log::debug!("Running `{} {}` in {}", cmd, args.join(" "), cwd.display());

    tokio::process::Command::new(cmd)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
        .kill_on_drop(true)
        .output()
        .await
}

/// Check if a command is available in PATH
pub fn is_command_available(cmd: &str) -> bool {
    if Command::new(cmd)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
    {
        return true;
    }

    // On Windows, also try with .exe extension
    if cfg!(windows) && !cmd.ends_with(".exe") {
        return Command::new(format!("{}.exe", cmd))
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
    }

    false
}
