use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clipgrid_core::ffmpeg::FfmpegTools;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to the review client
/// on a workstation.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `5180`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Exports run inside the request, so
    /// this bounds the longest export.
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Clips normalized in parallel per export.
    pub export_concurrency: usize,
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub probe_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `127.0.0.1`                |
    /// | `PORT`                 | `5180`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `900`                      |
    /// | `MAX_UPLOAD_BYTES`     | `1073741824`               |
    /// | `EXPORT_CONCURRENCY`   | available parallelism      |
    /// | `FFMPEG_BIN`           | `ffmpeg`                   |
    /// | `FFPROBE_BIN`          | `ffprobe`                  |
    /// | `PROBE_TIMEOUT_SECS`   | `30`                       |
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let default_concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Ok(Self {
            host,
            port: env_parse("PORT", 5180)?,
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 900)?,
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 1024 * 1024 * 1024)?,
            export_concurrency: env_parse("EXPORT_CONCURRENCY", default_concurrency)?.max(1),
            ffmpeg_bin: std::env::var("FFMPEG_BIN")
                .unwrap_or_else(|_| "ffmpeg".into())
                .into(),
            ffprobe_bin: std::env::var("FFPROBE_BIN")
                .unwrap_or_else(|_| "ffprobe".into())
                .into(),
            probe_timeout_secs: env_parse("PROBE_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn ffmpeg_tools(&self) -> FfmpegTools {
        FfmpegTools {
            ffmpeg: self.ffmpeg_bin.clone(),
            ffprobe: self.ffprobe_bin.clone(),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        _ => Ok(default),
    }
}
