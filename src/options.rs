//! Validated build options passed into the registry client and image driver.

use anyhow::{bail, Result};

pub const DEFAULT_RELEASE: &str = "rolling";
pub const DEFAULT_CHANNEL: &str = "edge";
pub const DEFAULT_ARCH: &str = "amd64";
pub const DEFAULT_QCOW2_COMPAT: &str = "1.1";
pub const DEFAULT_OS: &str = "ubuntu-core";
pub const DEFAULT_KERNEL: &str = "canonical-pc-linux";
pub const DEFAULT_GADGET: &str = "canonical-pc";

/// qcow2 compatibility levels understood by `qemu-img`.
pub const QCOW2_COMPAT_LEVELS: &[&str] = &["0.10", "1.1"];

/// Everything needed to build one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub release: String,
    pub channel: String,
    pub arch: String,
    pub qcow2_compat: String,
    pub os: String,
    pub kernel: String,
    pub gadget: String,
    pub os_channel: String,
    pub kernel_channel: String,
    pub gadget_channel: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            release: DEFAULT_RELEASE.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            arch: DEFAULT_ARCH.to_string(),
            qcow2_compat: DEFAULT_QCOW2_COMPAT.to_string(),
            os: DEFAULT_OS.to_string(),
            kernel: DEFAULT_KERNEL.to_string(),
            gadget: DEFAULT_GADGET.to_string(),
            os_channel: DEFAULT_CHANNEL.to_string(),
            kernel_channel: DEFAULT_CHANNEL.to_string(),
            gadget_channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

impl BuildOptions {
    /// Normalize the release and reject values that would produce broken
    /// command lines or image names.
    pub fn validate(mut self) -> Result<Self> {
        self.release = add_dot(&self.release);

        for (field, value) in [
            ("release", &self.release),
            ("channel", &self.channel),
            ("arch", &self.arch),
            ("os", &self.os),
            ("kernel", &self.kernel),
            ("gadget", &self.gadget),
            ("os channel", &self.os_channel),
            ("kernel channel", &self.kernel_channel),
            ("gadget channel", &self.gadget_channel),
        ] {
            validate_token(field, value)?;
        }

        if !QCOW2_COMPAT_LEVELS.contains(&self.qcow2_compat.as_str()) {
            bail!(
                "unsupported qcow2 compat '{}'; expected one of: {}",
                self.qcow2_compat,
                QCOW2_COMPAT_LEVELS.join(", ")
            );
        }

        Ok(self)
    }
}

fn validate_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{field} cannot be empty");
    }
    if value.chars().any(|c| c.is_whitespace() || c == '/') {
        bail!("{field} '{value}' must not contain whitespace or '/'");
    }
    Ok(())
}

/// `1604` -> `16.04`. Anything that is not exactly four digits is unchanged.
pub fn add_dot(release: &str) -> String {
    if release.len() == 4 && release.chars().all(|c| c.is_ascii_digit()) {
        format!("{}.{}", &release[..2], &release[2..])
    } else {
        release.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dot() {
        assert_eq!(add_dot("1604"), "16.04");
        assert_eq!(add_dot("16.04"), "16.04");
        assert_eq!(add_dot("rolling"), "rolling");
        assert_eq!(add_dot("160"), "160");
        assert_eq!(add_dot("16a4"), "16a4");
    }

    #[test]
    fn test_validate_normalizes_release() {
        let options = BuildOptions {
            release: "1504".into(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(options.release, "15.04");
    }

    #[test]
    fn test_validate_rejects_bad_compat() {
        let result = BuildOptions {
            qcow2_compat: "2.0".into(),
            ..Default::default()
        }
        .validate();
        assert!(result.unwrap_err().to_string().contains("qcow2 compat"));
    }

    #[test]
    fn test_validate_rejects_empty_and_whitespace() {
        let empty = BuildOptions {
            channel: String::new(),
            ..Default::default()
        }
        .validate();
        assert!(empty.is_err());

        let spaced = BuildOptions {
            gadget: "pc gadget".into(),
            ..Default::default()
        }
        .validate();
        assert!(spaced.unwrap_err().to_string().contains("gadget"));
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(BuildOptions::default().validate().is_ok());
    }
}
