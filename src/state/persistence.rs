use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Directory systemd reads user units from.
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,
    /// ssh binary written into each unit's ExecStart.
    #[serde(default = "default_ssh_path")]
    pub ssh_path: PathBuf,
    #[serde(default = "default_systemctl_path")]
    pub systemctl_path: PathBuf,
}

/// `$XDG_CONFIG_HOME`, falling back to `~/.config`.
fn config_home() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"))
}

fn default_unit_dir() -> PathBuf {
    config_home().join("systemd/user")
}

fn default_ssh_path() -> PathBuf {
    PathBuf::from("/usr/bin/ssh")
}

fn default_systemctl_path() -> PathBuf {
    PathBuf::from("systemctl")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            unit_dir: default_unit_dir(),
            ssh_path: default_ssh_path(),
            systemctl_path: default_systemctl_path(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        config_home().join("simple-tunnel/config.toml")
    }

    /// Load from `path` (or the default location). A missing file gives the
    /// defaults; an unreadable or malformed one is reported and also gives the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map_or_else(Self::config_path, Path::to_path_buf);
        if !path.exists() {
            return Self::default();
        }
        match Self::read(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "ignoring config file");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
