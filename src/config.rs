use clap::Parser;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Runtime configuration. Every flag can also come from the environment
/// (or a `.env` file).
#[derive(Debug, Clone, Parser)]
#[command(name = "gemini-bridge", version, about)]
pub struct BridgeConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Bearer token clients must present.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "sk-dummy-key", hide_env_values = true)]
    pub api_key: String,

    /// Gemini CLI executable.
    #[arg(long, env = "GEMINI_CLI", default_value = "gemini")]
    pub cli_program: String,

    /// Extra arguments placed before the generated ones (e.g. for `npx`).
    #[arg(long, env = "GEMINI_CLI_ARGS", value_delimiter = ' ', allow_hyphen_values = true)]
    pub cli_args: Vec<String>,

    /// Model used when a request does not name one.
    #[arg(long, env = "GEMINI_DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    pub default_model: String,

    /// DEBUG, INFO, WARNING, ERROR, CRITICAL or DISABLED.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl BridgeConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cli_program.trim().is_empty() {
            return Err(ConfigError::Empty("cli_program"));
        }
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::Empty("default_model"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Empty("api_key"));
        }
        Ok(())
    }
}
