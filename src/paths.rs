use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// `~/.bmx`, the directory holding the config file and both caches.
pub fn bmx_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;

    Ok(home.join(".bmx"))
}

pub fn config_file() -> Result<PathBuf> {
    Ok(bmx_dir()?.join("config"))
}

pub fn sessions_file() -> Result<PathBuf> {
    Ok(bmx_dir()?.join("sessions"))
}

pub fn creds_cache_file() -> Result<PathBuf> {
    Ok(bmx_dir()?.join("creds-cache"))
}

pub fn aws_credentials_file() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;

    Ok(home.join(".aws").join("credentials"))
}
