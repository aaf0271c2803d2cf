use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::state::AuthSettings;

/// Effective server configuration after all layers are merged.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub config: String,
    pub json_logs: bool,
    pub generate_config: bool,
    pub data_dir: String,
    /// Browser origin allowed to call the API with credentials
    pub cors_origin: String,
    pub secure_cookies: bool,
    pub session_ttl_days: i64,
    pub password_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5001,
            bind_address: "0.0.0.0".to_string(),
            config: "./huddle.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            secure_cookies: false,
            session_ttl_days: 7,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Huddle chat server
///
/// Only flags actually given on the command line are merged, so an omitted
/// flag never masks a value from the TOML file or the environment.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "huddle-server", version, about = "Huddle chat server")]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "HUDDLE_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long, env = "HUDDLE_BIND_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./huddle.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, keys)
    #[arg(long, env = "HUDDLE_DATA_DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Allowed CORS origin for the web client
    #[arg(long, env = "HUDDLE_CORS_ORIGIN")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,

    /// Mark the session cookie Secure (serve behind HTTPS)
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub secure_cookies: bool,

    /// Session lifetime in days
    #[arg(long, env = "HUDDLE_SESSION_TTL_DAYS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl_days: Option<i64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (HUDDLE_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self, figment::Error> {
        Self::figment(cli).extract()
    }

    pub(crate) fn figment(cli: Cli) -> Figment {
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("HUDDLE_"))
            .merge(Serialized::defaults(cli))
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            session_ttl_days: self.session_ttl_days,
            secure_cookies: self.secure_cookies,
            password_cost: self.password_cost,
        }
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Huddle Server Configuration
# Place this file at ./huddle.toml or specify with --config <path>
# All settings can be overridden via environment variables (HUDDLE_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5001)
# port = 5001

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database and JWT signing key
# data_dir = "./data"

# Origin of the web client allowed to make credentialed requests
# cors_origin = "http://localhost:5173"

# ---- Sessions ----

# Add the Secure attribute to the session cookie (enable behind HTTPS)
# secure_cookies = false

# Session token and cookie lifetime in days
# session_ttl_days = 7

# bcrypt cost for new password hashes
# password_cost = 12
"#
    .to_string()
}
