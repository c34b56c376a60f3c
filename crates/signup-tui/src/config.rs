use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::form::MAX_AVATAR_BYTES;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_file: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub upload_chunk_bytes: usize,
    pub notice_seconds: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: None,
            max_upload_bytes: MAX_AVATAR_BYTES,
            upload_chunk_bytes: 8192,
            notice_seconds: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_file: env::var("SIGNUP_LOG_FILE").ok().map(PathBuf::from),
            max_upload_bytes: var_or("SIGNUP_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            upload_chunk_bytes: var_or("SIGNUP_UPLOAD_CHUNK_BYTES", defaults.upload_chunk_bytes)?
                .max(1),
            notice_seconds: var_or("SIGNUP_NOTICE_SECONDS", defaults.notice_seconds)?,
        })
    }

    /// Log file location, falling back to the user's cache directory.
    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_file {
            return Ok(path.clone());
        }

        let dir = dirs::cache_dir()
            .context("Could not find cache directory")?
            .join("signup");

        std::fs::create_dir_all(&dir).context("Could not create log directory")?;

        Ok(dir.join("signup.log"))
    }
}

fn var_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
