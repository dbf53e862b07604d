//! `ubuntu-device-flash` invocation shapes.
//!
//! 15.04 images are flashed by revision straight from the system-image
//! server; every later release is assembled from the three snaps fetched
//! beforehand.

use std::path::Path;

use super::ArtifactRef;
use crate::options::BuildOptions;

/// Release still flashed by revision.
pub const LEGACY_RELEASE: &str = "15.04";

/// Architecture that needs an explicit hardware profile.
pub const BEAGLEBONE_ARCH: &str = "arm";
pub const BEAGLEBONE_OEM: &str = "beagleblack";

/// How a release is flashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashStrategy {
    /// `--revision=<version>`, no snap arguments.
    Legacy,
    /// `--os/--kernel/--gadget` pointing at downloaded snaps.
    Standard,
}

impl FlashStrategy {
    pub fn for_release(release: &str) -> Self {
        if release == LEGACY_RELEASE {
            FlashStrategy::Legacy
        } else {
            FlashStrategy::Standard
        }
    }

    /// Full command line, `sudo` included.
    pub fn args(&self, options: &BuildOptions, version: u64, output: &Path) -> Vec<String> {
        let mut args = vec!["sudo".to_string(), "ubuntu-device-flash".to_string()];

        match self {
            FlashStrategy::Legacy => {
                args.push(format!("--revision={version}"));
                args.extend(core_args(options));
                args.push("--developer-mode".to_string());
            }
            FlashStrategy::Standard => {
                args.extend(core_args(options));
                for artifact in ArtifactRef::all(options) {
                    args.push(format!("--{}", artifact.kind.flag()));
                    args.push(artifact.snap_filename());
                }
                args.push("--developer-mode".to_string());
                if options.arch == BEAGLEBONE_ARCH {
                    args.push("--oem".to_string());
                    args.push(BEAGLEBONE_OEM.to_string());
                }
            }
        }

        args.push("-o".to_string());
        args.push(output.display().to_string());
        args
    }
}

fn core_args(options: &BuildOptions) -> [String; 4] {
    [
        "core".to_string(),
        options.release.clone(),
        "--channel".to_string(),
        options.channel.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(release: &str, arch: &str) -> BuildOptions {
        BuildOptions {
            release: release.into(),
            channel: "edge".into(),
            arch: arch.into(),
            os: "os1".into(),
            kernel: "kernel1".into(),
            gadget: "gadget1".into(),
            os_channel: "oschan1".into(),
            kernel_channel: "kernchan1".into(),
            gadget_channel: "gadgetchan1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(FlashStrategy::for_release("15.04"), FlashStrategy::Legacy);
        assert_eq!(FlashStrategy::for_release("16.04"), FlashStrategy::Standard);
        assert_eq!(FlashStrategy::for_release("rolling"), FlashStrategy::Standard);
        assert_eq!(FlashStrategy::for_release("1504"), FlashStrategy::Standard);
    }

    #[test]
    fn test_standard_args() {
        let args = FlashStrategy::Standard.args(&options("16.04", "amd64"), 100, Path::new("t/raw.img"));
        assert_eq!(
            args.join(" "),
            "sudo ubuntu-device-flash core 16.04 --channel edge --os os1_oschan1.snap \
             --kernel kernel1_kernchan1.snap --gadget gadget1_gadgetchan1.snap \
             --developer-mode -o t/raw.img"
        );
    }

    #[test]
    fn test_standard_args_for_arm_add_oem() {
        let args = FlashStrategy::Standard.args(&options("17.10", "arm"), 56, Path::new("t/raw.img"));
        let line = args.join(" ");
        assert!(line.ends_with("--developer-mode --oem beagleblack -o t/raw.img"));
        assert!(!line.contains("--revision"));
    }

    #[test]
    fn test_legacy_args() {
        let args = FlashStrategy::Legacy.args(&options("15.04", "amd64"), 56, Path::new("t/raw.img"));
        assert_eq!(
            args.join(" "),
            "sudo ubuntu-device-flash --revision=56 core 15.04 --channel edge --developer-mode -o t/raw.img"
        );
    }

    #[test]
    fn test_legacy_args_never_reference_snaps() {
        let args = FlashStrategy::Legacy.args(&options("15.04", "arm"), 1, Path::new("raw.img"));
        for flag in ["--os", "--kernel", "--gadget", "--oem"] {
            assert!(!args.iter().any(|a| a == flag), "unexpected {flag}");
        }
    }
}
