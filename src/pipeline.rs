//! Resolve, build, publish.
//!
//! The version is computed once and handed to both the driver and the
//! registry, so the built image and the published name always agree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cloud::{image_name, Client};
use crate::image::Driver;
use crate::options::BuildOptions;
use crate::process::CliCommander;

/// A finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built {
    pub version: u64,
    pub path: PathBuf,
}

/// Version the next image of the triple gets.
pub fn next_version<C: CliCommander>(client: &Client<C>, options: &BuildOptions) -> Result<u64> {
    let latest = client
        .get_latest_version(&options.release, &options.channel, &options.arch)
        .with_context(|| {
            format!(
                "getting latest version for {} {} {}",
                options.release, options.channel, options.arch
            )
        })?;
    info!(latest, "latest published version");
    latest
        .checked_add(1)
        .with_context(|| format!("version overflow: latest published version is {latest}"))
}

/// Build the next version locally.
pub fn build_next<C: CliCommander>(
    client: &Client<C>,
    driver: &dyn Driver,
    options: &BuildOptions,
) -> Result<Built> {
    let version = next_version(client, options)?;
    let path = driver
        .create(options, version)
        .with_context(|| format!("building image version {version}"))?;
    Ok(Built { version, path })
}

/// Build the next version and publish it. Returns the published name.
pub fn create_and_publish<C: CliCommander>(
    client: &Client<C>,
    driver: &dyn Driver,
    options: &BuildOptions,
) -> Result<String> {
    let built = build_next(client, driver, options)?;
    let path = built.path.display().to_string();
    client
        .create(
            &path,
            &options.release,
            &options.channel,
            &options.arch,
            built.version,
        )
        .with_context(|| format!("publishing {path}"))?;

    let name = image_name(&options.release, &options.channel, &options.arch, built.version);
    info!(%name, "published");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageError;
    use crate::process::testing::FakeCommander;
    use crate::process::ExecError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeDriver {
        versions: RefCell<Vec<u64>>,
        fail: bool,
    }

    impl Driver for FakeDriver {
        fn create(&self, _options: &BuildOptions, version: u64) -> Result<PathBuf, ImageError> {
            self.versions.borrow_mut().push(version);
            if self.fail {
                return Err(ImageError::Exec(ExecError::Empty));
            }
            Ok(PathBuf::from("/tmp/ws/snappy.qcow2"))
        }
    }

    fn listing_with(version: u64) -> String {
        format!(
            "| id | {} |\n",
            image_name("rolling", "edge", "amd64", version)
        )
    }

    #[test]
    fn test_first_version_is_one() {
        let client = Client::new(FakeCommander::with_output("| id | other |\n"));
        assert_eq!(next_version(&client, &BuildOptions::default()).unwrap(), 1);
    }

    #[test]
    fn test_next_version_overflow_is_an_error() {
        let client = Client::new(FakeCommander::with_output(&listing_with(u64::MAX)));
        let driver = FakeDriver::default();

        let err = build_next(&client, &driver, &BuildOptions::default()).unwrap_err();
        assert!(err.to_string().contains("version overflow"));
        assert!(driver.versions.borrow().is_empty());
    }

    #[test]
    fn test_build_and_publish_use_the_same_version() {
        let client = Client::new(FakeCommander::with_output(&listing_with(41)));
        let driver = FakeDriver::default();

        let name = create_and_publish(&client, &driver, &BuildOptions::default()).unwrap();

        assert_eq!(*driver.versions.borrow(), [42]);
        assert_eq!(
            name,
            "ubuntu-core/custom/ubuntu-rolling-snappy-core-amd64-edge-42-disk1.img"
        );
        assert_eq!(
            client.cli_calls(),
            [
                "openstack image list".to_string(),
                format!("openstack image create --file /tmp/ws/snappy.qcow2 {name}"),
            ]
        );
    }

    #[test]
    fn test_build_failure_skips_publish() {
        let client = Client::new(FakeCommander::with_output(&listing_with(1)));
        let driver = FakeDriver {
            fail: true,
            ..Default::default()
        };

        let err = create_and_publish(&client, &driver, &BuildOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("building image version 2"));
        assert_eq!(client.cli_calls(), ["openstack image list"]);
    }

    #[test]
    fn test_registry_failure_skips_build() {
        let client = Client::new(FakeCommander::default().failing_after(0));
        let driver = FakeDriver::default();

        assert!(build_next(&client, &driver, &BuildOptions::default()).is_err());
        assert!(driver.versions.borrow().is_empty());
    }
}
