use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// The exact command line for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchSpec {
    pub fn new(config: &BridgeConfig, prompt: &str, model: &str) -> Self {
        let mut args: Vec<String> = config
            .cli_args
            .iter()
            .filter(|arg| !arg.is_empty())
            .cloned()
            .collect();
        args.extend([
            "--prompt".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--model".to_string(),
            model.to_string(),
        ]);

        Self {
            program: config.cli_program.clone(),
            args,
        }
    }
}

/// A running generator with its output pipes detached for incremental reads.
pub struct GeneratorProcess {
    pub child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

pub fn launch(spec: &LaunchSpec) -> Result<GeneratorProcess, BridgeError> {
    tracing::info!("Spawning: {} {}", spec.program, spec.args.join(" "));

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(BridgeError::Spawn)?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(BridgeError::Spawn(std::io::Error::other(
            "child output pipes unavailable",
        )));
    };

    Ok(GeneratorProcess {
        child,
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn argument_list_follows_leading_args() {
        let config = BridgeConfig::parse_from([
            "gemini-bridge",
            "--cli-program",
            "npx",
            "--cli-args",
            "-y @google/gemini-cli",
        ]);

        let spec = LaunchSpec::new(&config, "User: hi\nAssistant:", "gemini-2.5-pro");

        assert_eq!(spec.program, "npx");
        assert_eq!(
            spec.args,
            vec![
                "-y",
                "@google/gemini-cli",
                "--prompt",
                "User: hi\nAssistant:",
                "--output-format",
                "stream-json",
                "--model",
                "gemini-2.5-pro",
            ]
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = LaunchSpec {
            program: "/nonexistent/gemini-bridge-test-binary".to_string(),
            args: Vec::new(),
        };
        assert!(matches!(launch(&spec), Err(BridgeError::Spawn(_))));
    }
}
