// SPDX-License-Identifier: MIT

//! Loads [`Config`] from `data/config.toml`, layered under defaults and over
//! by `REAPER_`-prefixed environment variables. Unknown toml keys are
//! ignored (serde's default behavior); missing keys fall back to
//! [`Config::default`] because every field carries `#[serde(default)]`.

use std::path::Path;

use reaper_core::model::Config;

use crate::error::{DaemonError, DaemonResult};

pub async fn load(data_dir: &Path) -> DaemonResult<Config> {
    let path = data_dir.join("config.toml");
    let mut config = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => toml::from_str(&contents)
            .map_err(|err| DaemonError::config(format!("{}: {err}", path.display())))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(err) => return Err(err.into()),
    };
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) -> DaemonResult<()> {
    if let Ok(v) = std::env::var("REAPER_DOWNLOAD_DIR") {
        config.download_dir = v.into();
    }
    if let Ok(v) = std::env::var("REAPER_TEMP_DIR") {
        config.temp_dir = v.into();
    }
    if let Ok(v) = std::env::var("REAPER_SERVER_HOST") {
        config.server_host = v;
    }
    if let Ok(v) = std::env::var("REAPER_SERVER_PORT") {
        config.server_port = v
            .parse()
            .map_err(|_| DaemonError::config(format!("REAPER_SERVER_PORT is not a valid port: {v:?}")))?;
    }
    if let Ok(v) = std::env::var("REAPER_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Ok(v) = std::env::var("REAPER_USER_TIMEZONE") {
        config.user_timezone = v;
    }
    if let Ok(v) = std::env::var("REAPER_PUBLIC_USER") {
        config.public_user = Some(v);
    }
    Ok(())
}

fn validate(config: &Config) -> DaemonResult<()> {
    if config.server_port == 0 {
        return Err(DaemonError::config("server_port must not be 0"));
    }
    if config.user_timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(DaemonError::config(format!(
            "user_timezone {:?} is not a recognized IANA timezone",
            config.user_timezone
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
