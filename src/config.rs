use std::env;

use anyhow::{Context, Error};
use base64::prelude::*;

/// Configuration for the Snowflake grant connector, loaded during init().
#[derive(Clone)]
pub struct SnowflakeConnectorConfig {
    pub account: String,
    pub user: String,
    pub role: String,
    pub warehouse: String,
    pub private_key: String,
}

impl SnowflakeConnectorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let account = lookup("SF_ACCOUNT").context("SF_ACCOUNT env var not set!")?;
        let user = lookup("SF_USER").context("SF_USER env var not set!")?;
        let role = lookup("SF_ROLE").context("SF_ROLE env var not set!")?;
        let warehouse = lookup("SF_WAREHOUSE").context("SF_WAREHOUSE env var not set!")?;
        let private_key_base64 = lookup("SF_PRIVATE_KEY_BASE64");
        let private_key_path = lookup("SF_PRIVATE_KEY_PATH");

        let private_key = match (private_key_base64, private_key_path) {
            (Some(_), Some(_)) => Err(Error::msg(
                "Ambiguous: Only one of SF_PRIVATE_KEY_BASE64 and SF_PRIVATE_KEY_PATH can be set!",
            )),
            (Some(private_key_base64), None) => {
                let private_key = BASE64_STANDARD
                    .decode(private_key_base64.trim())
                    .context("Failed to decode SF_PRIVATE_KEY_BASE64")?;
                Ok(String::from_utf8(private_key).context("SF_PRIVATE_KEY_BASE64 is not valid UTF-8")?)
            }
            (None, Some(private_key_path)) => std::fs::read_to_string(&private_key_path)
                .with_context(|| format!("Failed to read private key from {}", private_key_path)),
            (None, None) => Err(Error::msg("SF_PRIVATE_KEY_BASE64 or SF_PRIVATE_KEY_PATH not set!")),
        }?;

        Ok(SnowflakeConnectorConfig {
            account,
            user,
            role,
            warehouse,
            private_key,
        })
    }
}
