//! TOML configuration for the `xray` CLI.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below. See `config/xray.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use xray_core::copy::{CopyOptions, LinkTarget};
use xray_core::render::RenderOptions;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub copy: CopyConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CopyConfig {
    #[serde(default = "default_title_suffix")]
    pub title_suffix: String,
    /// `destination` or `source`.
    #[serde(default = "default_link_target")]
    pub link_target: String,
    #[serde(default = "default_visibility_attempts")]
    pub visibility_attempts: u32,
    #[serde(default = "default_visibility_delay_ms")]
    pub visibility_delay_ms: u64,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            title_suffix: default_title_suffix(),
            link_target: default_link_target(),
            visibility_attempts: default_visibility_attempts(),
            visibility_delay_ms: default_visibility_delay_ms(),
        }
    }
}

fn default_title_suffix() -> String {
    " (copy)".to_string()
}
fn default_link_target() -> String {
    "destination".to_string()
}
fn default_visibility_attempts() -> u32 {
    40
}
fn default_visibility_delay_ms() -> u64 {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_preview_chars() -> usize {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl CopyConfig {
    pub fn link_target(&self) -> Result<LinkTarget> {
        match self.link_target.as_str() {
            "destination" => Ok(LinkTarget::Destination),
            "source" => Ok(LinkTarget::Source),
            other => anyhow::bail!(
                "Unknown copy.link_target: '{}'. Must be destination or source.",
                other
            ),
        }
    }
}

impl Config {
    /// Options for the copy command.
    pub fn copy_options(&self) -> Result<CopyOptions> {
        Ok(CopyOptions {
            title_suffix: self.copy.title_suffix.clone(),
            link_target: self.copy.link_target()?,
            visibility_attempts: self.copy.visibility_attempts,
            visibility_delay: Duration::from_millis(self.copy.visibility_delay_ms),
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            preview_chars: self.render.preview_chars,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate copy
    if config.copy.visibility_attempts < 1 {
        anyhow::bail!("copy.visibility_attempts must be >= 1");
    }
    config.copy.link_target()?;

    // Validate render
    if config.render.preview_chars < 1 {
        anyhow::bail!("render.preview_chars must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("xray.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&write(&dir, "")).unwrap();
        let opts = cfg.copy_options().unwrap();
        assert_eq!(opts.title_suffix, " (copy)");
        assert_eq!(opts.link_target, LinkTarget::Destination);
        assert_eq!(opts.visibility_attempts, 40);
        assert_eq!(opts.visibility_delay, Duration::from_millis(150));
        assert_eq!(cfg.render_options().preview_chars, 60);
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn test_overrides() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&write(
            &dir,
            "[copy]\nlink_target = \"source\"\ntitle_suffix = \" - dup\"\n\n[render]\npreview_chars = 10\n",
        ))
        .unwrap();
        assert_eq!(cfg.copy_options().unwrap().link_target, LinkTarget::Source);
        assert_eq!(cfg.copy.title_suffix, " - dup");
        assert_eq!(cfg.render.preview_chars, 10);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&write(&dir, "[copy]\nvisibility_attempts = 0\n")).unwrap_err();
        assert!(err.to_string().contains("visibility_attempts"));

        let err = load_config(&write(&dir, "[copy]\nlink_target = \"sideways\"\n")).unwrap_err();
        assert!(err.to_string().contains("link_target"));

        let err = load_config(&write(&dir, "[render]\npreview_chars = 0\n")).unwrap_err();
        assert!(err.to_string().contains("preview_chars"));
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(&dir.path().join("nope.toml")).is_err());
    }
}
