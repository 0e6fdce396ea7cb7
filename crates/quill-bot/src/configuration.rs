use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use quill::agent::{AgentConfig, DEFAULT_MAX_TOOL_ROUNDS};
use quill::database::DatabaseConfig;
use quill::providers::configs::{
    GoogleProviderConfig, GOOGLE_HOST, GOOGLE_IMAGE_MODEL, GOOGLE_MODEL,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Keys with no default; startup fails naming the variable when one is absent
const REQUIRED: [&str; 6] = [
    "discord.token",
    "database.host",
    "database.user",
    "database.password",
    "database.name",
    "provider.api_key",
];

#[derive(Deserialize)]
pub struct DiscordSettings {
    pub token: String,
}

impl std::fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSettings").finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_database_port")]
    pub port: u16,
}

impl DatabaseSettings {
    pub fn into_config(self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
            name: self.name,
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
pub struct ProviderSettings {
    pub api_key: String,
    #[serde(default = "default_provider_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderSettings {
    pub fn into_config(self) -> GoogleProviderConfig {
        GoogleProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            image_model: self.image_model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl AgentSettings {
    pub fn into_config(self) -> AgentConfig {
        AgentConfig {
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            upload_dir: default_upload_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub discord: DiscordSettings,
    pub database: DatabaseSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("database.port", default_database_port() as i64)?
            .set_default("provider.host", default_provider_host())?
            .set_default("provider.model", default_model())?
            .set_default("provider.image_model", default_image_model())?
            .set_default("agent.max_tool_rounds", default_max_tool_rounds() as i64)?
            .set_default("paths.output_dir", "output")?
            .set_default("paths.upload_dir", "uploads")?
            // Layer on the environment variables. Values stay strings so secrets
            // like `007123` are not reparsed; serde converts the numeric fields.
            .add_source(
                Environment::with_prefix("QUILL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        for key in REQUIRED {
            if let Err(err) = config.get_string(key) {
                tracing::debug!("Configuration error: {:?}", &err);
                return Err(ConfigError::MissingEnvVar {
                    env_var: to_env_var(key),
                });
            }
        }

        let result: Result<Self, config::ConfigError> = config.try_deserialize();
        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);
                if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_database_port() -> u16 {
    3306
}

fn default_provider_host() -> String {
    GOOGLE_HOST.to_string()
}

fn default_model() -> String {
    GOOGLE_MODEL.to_string()
}

fn default_image_model() -> String {
    GOOGLE_IMAGE_MODEL.to_string()
}

fn default_max_tool_rounds() -> usize {
    DEFAULT_MAX_TOOL_ROUNDS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
