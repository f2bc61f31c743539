use anyhow::{bail, Result};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Read the model API key. Missing or blank is an error; callers treat it as
/// fatal before touching the database.
pub fn api_key_from_env() -> Result<String> {
    api_key_from(std::env::var(API_KEY_ENV).ok())
}

fn api_key_from(value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => bail!("{API_KEY_ENV} environment variable not set"),
    }
}
