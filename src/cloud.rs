//! Image registry client (OpenStack Glance through the `openstack` CLI).
//!
//! Published images are named
//! `ubuntu-core/custom/ubuntu-<release>-snappy-core-<arch>-<channel>-<version>-disk1.img`.
//! The registry has no notion of versions, so the latest one is recovered by
//! scanning the full image listing for names of that shape.

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::process::{argv, CliCommander, ExecError};

/// Image name suffix following the version.
pub const IMAGE_NAME_SUFFIX: &str = "disk1.img";

/// Image name up to (not including) the version.
pub fn image_name_prefix(release: &str, arch: &str, channel: &str) -> String {
    format!("ubuntu-core/custom/ubuntu-{release}-snappy-core-{arch}-{channel}")
}

/// Full registry name of a published image.
pub fn image_name(release: &str, channel: &str, arch: &str, version: u64) -> String {
    format!(
        "{}-{version}-{IMAGE_NAME_SUFFIX}",
        image_name_prefix(release, arch, channel)
    )
}

#[derive(Debug, Error)]
pub enum CloudError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("no image found for release {release}, channel {channel} and arch {arch}")]
    VersionNotFound {
        release: String,
        channel: String,
        arch: String,
    },
}

/// Registry client.
pub struct Client<C> {
    cli: C,
}

impl<C: CliCommander> Client<C> {
    pub fn new(cli: C) -> Self {
        Self { cli }
    }

    /// Highest published version for the triple, or 0 when none exists yet.
    pub fn get_latest_version(
        &self,
        release: &str,
        channel: &str,
        arch: &str,
    ) -> Result<u64, CloudError> {
        Ok(self.find_latest(release, channel, arch)?.unwrap_or(0))
    }

    /// Like [`Client::get_latest_version`], but an empty result is
    /// [`CloudError::VersionNotFound`].
    pub fn get_latest_version_strict(
        &self,
        release: &str,
        channel: &str,
        arch: &str,
    ) -> Result<u64, CloudError> {
        self.find_latest(release, channel, arch)?
            .ok_or_else(|| CloudError::VersionNotFound {
                release: release.to_string(),
                channel: channel.to_string(),
                arch: arch.to_string(),
            })
    }

    /// Upload `path` as the image for `version` of the triple.
    pub fn create(
        &self,
        path: &str,
        release: &str,
        channel: &str,
        arch: &str,
        version: u64,
    ) -> Result<(), CloudError> {
        let name = image_name(release, channel, arch, version);
        info!(%name, %path, "publishing image");
        self.cli.exec_command(&argv(&[
            "openstack",
            "image",
            "create",
            "--file",
            path,
            &name,
        ]))?;
        Ok(())
    }

    fn find_latest(
        &self,
        release: &str,
        channel: &str,
        arch: &str,
    ) -> Result<Option<u64>, CloudError> {
        let listing = self
            .cli
            .exec_command(&argv(&["openstack", "image", "list"]))?;
        let latest = latest_in_listing(&listing, release, channel, arch);
        debug!(release, channel, arch, ?latest, "scanned image listing");
        Ok(latest)
    }
}

#[cfg(test)]
impl Client<crate::process::testing::FakeCommander> {
    pub(crate) fn cli_calls(&self) -> Vec<String> {
        self.cli.calls.borrow().clone()
    }
}

/// Maximum version among the listing lines naming an image of the triple.
fn latest_in_listing(listing: &str, release: &str, channel: &str, arch: &str) -> Option<u64> {
    let pattern = version_pattern(release, channel, arch);
    listing
        .lines()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| match caps[1].parse::<u64>() {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(version = &caps[1], "skipping unparsable image version: {e}");
                None
            }
        })
        .max()
}

fn version_pattern(release: &str, channel: &str, arch: &str) -> Regex {
    let expr = format!(
        r"{}-snappy-core-{}-{}-(\d+)-{}",
        regex::escape(release),
        regex::escape(arch),
        regex::escape(channel),
        regex::escape(IMAGE_NAME_SUFFIX)
    );
    // Every component is escaped, so the expression is always valid.
    Regex::new(&expr).unwrap_or_else(|e| unreachable!("invalid version pattern {expr}: {e}"))
}
