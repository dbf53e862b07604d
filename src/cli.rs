//! Command-line surface, merged with the config file into [`Settings`].

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::ConfigFile;
use crate::options::{BuildOptions, DEFAULT_CHANNEL};

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Build the next image version and publish it.
    Create,
    /// Build the next image version without publishing it.
    Build,
    /// Print the latest published version.
    Latest,
}

/// Build and publish Ubuntu Core cloud images.
///
/// Flags override values from the config file, which override the
/// built-in defaults.
#[derive(Debug, Parser)]
#[command(name = "snappy-cloud-image", version)]
pub struct Cli {
    /// Action to be performed.
    #[arg(long, value_enum, default_value_t = Action::Create)]
    pub action: Action,

    /// Release of the image (`1604` is read as `16.04`) [default: rolling]
    #[arg(long)]
    pub release: Option<String>,

    /// Channel of the image [default: edge]
    #[arg(long)]
    pub channel: Option<String>,

    /// Architecture of the image [default: amd64]
    #[arg(long)]
    pub arch: Option<String>,

    /// One of trace, debug, info, warning, error, fatal, panic [default: info]
    #[arg(long)]
    pub loglevel: Option<String>,

    /// qcow2 compatibility level, 0.10 or 1.1 [default: 1.1]
    #[arg(long)]
    pub qcow2compat: Option<String>,

    /// OS snap [default: ubuntu-core]
    #[arg(long)]
    pub os: Option<String>,

    /// Kernel snap [default: canonical-pc-linux]
    #[arg(long)]
    pub kernel: Option<String>,

    /// Gadget snap [default: canonical-pc]
    #[arg(long)]
    pub gadget: Option<String>,

    /// Channel of the OS snap [default: the image channel]
    #[arg(long)]
    pub os_channel: Option<String>,

    /// Channel of the kernel snap [default: the image channel]
    #[arg(long)]
    pub kernel_channel: Option<String>,

    /// Channel of the gadget snap [default: the image channel]
    #[arg(long)]
    pub gadget_channel: Option<String>,

    /// Config file [default: $XDG_CONFIG_HOME/snappy-cloud-image/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Everything the binary needs after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub action: Action,
    pub log_level: String,
    pub options: BuildOptions,
}

impl Cli {
    /// Merge flags over `file` over defaults, then validate.
    pub fn resolve(self, file: ConfigFile) -> Result<Settings> {
        let defaults = BuildOptions::default();
        let pick = |flag: Option<String>, from_file: Option<String>, default: String| {
            flag.or(from_file).unwrap_or(default)
        };

        let channel = pick(self.channel, file.channel, DEFAULT_CHANNEL.to_string());
        let options = BuildOptions {
            release: pick(self.release, file.release, defaults.release),
            arch: pick(self.arch, file.arch, defaults.arch),
            qcow2_compat: pick(self.qcow2compat, file.qcow2compat, defaults.qcow2_compat),
            os: pick(self.os, file.os, defaults.os),
            kernel: pick(self.kernel, file.kernel, defaults.kernel),
            gadget: pick(self.gadget, file.gadget, defaults.gadget),
            os_channel: pick(self.os_channel, file.os_channel, channel.clone()),
            kernel_channel: pick(self.kernel_channel, file.kernel_channel, channel.clone()),
            gadget_channel: pick(self.gadget_channel, file.gadget_channel, channel.clone()),
            channel,
        }
        .validate()?;

        Ok(Settings {
            action: self.action,
            log_level: pick(self.loglevel, file.loglevel, DEFAULT_LOG_LEVEL.to_string()),
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("snappy-cloud-image").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]).resolve(ConfigFile::default()).unwrap();
        assert_eq!(settings.action, Action::Create);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.options, BuildOptions::default());
    }

    #[test]
    fn test_snap_channels_follow_image_channel() {
        let settings = parse(&["--channel", "stable", "--kernel-channel", "beta"])
            .resolve(ConfigFile::default())
            .unwrap();
        assert_eq!(settings.options.channel, "stable");
        assert_eq!(settings.options.os_channel, "stable");
        assert_eq!(settings.options.kernel_channel, "beta");
        assert_eq!(settings.options.gadget_channel, "stable");
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = ConfigFile {
            release: Some("16.04".into()),
            arch: Some("arm".into()),
            loglevel: Some("debug".into()),
            ..Default::default()
        };
        let settings = parse(&["--release", "1510", "--action", "latest"])
            .resolve(file)
            .unwrap();
        assert_eq!(settings.action, Action::Latest);
        assert_eq!(settings.options.release, "15.10");
        assert_eq!(settings.options.arch, "arm");
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse(&["--qcow2compat", "3"])
            .resolve(ConfigFile::default())
            .is_err());
        assert!(Cli::try_parse_from(["snappy-cloud-image", "--action", "destroy"]).is_err());
    }
}
