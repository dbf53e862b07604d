//! Optional TOML file supplying defaults for the command-line options.
//!
//! ```toml
//! release = "16.04"
//! channel = "stable"
//! arch = "amd64"
//! loglevel = "debug"
//! qcow2compat = "0.10"
//! os = "ubuntu-core"
//! kernel = "canonical-pc-linux"
//! gadget = "canonical-pc"
//! os_channel = "stable"
//! kernel_channel = "stable"
//! gadget_channel = "stable"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "snappy-cloud-image";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub release: Option<String>,
    pub channel: Option<String>,
    pub arch: Option<String>,
    pub loglevel: Option<String>,
    pub qcow2compat: Option<String>,
    pub os: Option<String>,
    pub kernel: Option<String>,
    pub gadget: Option<String>,
    pub os_channel: Option<String>,
    pub kernel_channel: Option<String>,
    pub gadget_channel: Option<String>,
}

/// `$XDG_CONFIG_HOME/snappy-cloud-image/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn load(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config '{}'", path.display()))
}

/// Load `explicit` if given (it must exist), otherwise the default config
/// file if present, otherwise an empty config.
pub fn load_optional(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => load(&path),
        _ => Ok(ConfigFile::default()),
    }
}
