use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted config key, e.g.
/// `provider.api_key` -> `QUILL_PROVIDER__API_KEY`
pub fn to_env_var(field: &str) -> String {
    format!("QUILL_{}", field.replace('.', "__").to_uppercase())
}
