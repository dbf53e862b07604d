//! Image assembly: fetch snaps, flash a raw disk, convert it to qcow2.
//!
//! Every build gets its own `mktemp -d` workspace holding
//! [`RAW_OUTPUT_FILE_NAME`] and [`OUTPUT_FILE_NAME`]. The workspace is never
//! removed, on success or on failure, so partial artifacts stay inspectable.

pub mod flash;
pub mod store;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::options::BuildOptions;
use crate::process::{argv, CliCommander, ExecError};
use flash::FlashStrategy;
use store::{LogProgress, RemoteSnap, StoreClient, StoreError};

/// Raw image written by `ubuntu-device-flash`.
pub const RAW_OUTPUT_FILE_NAME: &str = "snappy-raw.img";
/// Converted image returned to the caller.
pub const OUTPUT_FILE_NAME: &str = "snappy.qcow2";

pub const QEMU_IMG: &str = "/usr/bin/qemu-img";

/// The three snaps an image is assembled from, in fetch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Os,
    Kernel,
    Gadget,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Os, ArtifactKind::Kernel, ArtifactKind::Gadget];

    /// `ubuntu-device-flash` flag name.
    pub fn flag(&self) -> &'static str {
        match self {
            ArtifactKind::Os => "os",
            ArtifactKind::Kernel => "kernel",
            ArtifactKind::Gadget => "gadget",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// Name and channel of one snap to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub name: String,
    pub channel: String,
}

impl ArtifactRef {
    pub fn all(options: &BuildOptions) -> [ArtifactRef; 3] {
        ArtifactKind::ALL.map(|kind| {
            let (name, channel) = match kind {
                ArtifactKind::Os => (&options.os, &options.os_channel),
                ArtifactKind::Kernel => (&options.kernel, &options.kernel_channel),
                ArtifactKind::Gadget => (&options.gadget, &options.gadget_channel),
            };
            ArtifactRef {
                kind,
                name: name.clone(),
                channel: channel.clone(),
            }
        })
    }

    /// File name the flash tool is pointed at.
    pub fn snap_filename(&self) -> String {
        format!("{}_{}.snap", self.name, self.channel)
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("error getting details of {kind} snap {name} (developer '{developer}', channel {channel})")]
    RepoDetail {
        kind: ArtifactKind,
        name: String,
        developer: String,
        channel: String,
        #[source]
        source: StoreError,
    },

    #[error("expected exactly one {kind} snap {name} (developer '{developer}', channel {channel}), found {count}")]
    RepoDetailLen {
        kind: ArtifactKind,
        name: String,
        developer: String,
        channel: String,
        count: usize,
    },

    #[error("error downloading {kind} snap {name} (developer '{developer}', channel {channel})")]
    RepoDownload {
        kind: ArtifactKind,
        name: String,
        developer: String,
        channel: String,
        #[source]
        source: StoreError,
    },
}

impl ImageError {
    /// The snap a fetch error refers to.
    pub fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            ImageError::Exec(_) => None,
            ImageError::RepoDetail { kind, .. }
            | ImageError::RepoDetailLen { kind, .. }
            | ImageError::RepoDownload { kind, .. } => Some(*kind),
        }
    }
}

/// Builds an image and returns the path of the finished file.
pub trait Driver {
    fn create(&self, options: &BuildOptions, version: u64) -> Result<PathBuf, ImageError>;
}

/// Flashes with `ubuntu-device-flash` and converts with `qemu-img`.
pub struct UdfQcow2<C, S> {
    cli: C,
    store: S,
}

impl<C: CliCommander, S: StoreClient> UdfQcow2<C, S> {
    pub fn new(cli: C, store: S) -> Self {
        Self { cli, store }
    }

    fn make_workspace(&self) -> Result<PathBuf, ImageError> {
        let output = self.cli.exec_command(&argv(&["mktemp", "-d"]))?;
        let workspace = PathBuf::from(output.trim());
        debug!(workspace = %workspace.display(), "created workspace");
        Ok(workspace)
    }

    fn fetch(&self, artifact: &ArtifactRef) -> Result<PathBuf, ImageError> {
        // The developer selector is unused by this tool.
        let developer = "";
        let snaps = self
            .store
            .details(&artifact.name, developer, &artifact.channel)
            .map_err(|source| ImageError::RepoDetail {
                kind: artifact.kind,
                name: artifact.name.clone(),
                developer: developer.to_string(),
                channel: artifact.channel.clone(),
                source,
            })?;

        let snap: RemoteSnap = match <[RemoteSnap; 1]>::try_from(snaps) {
            Ok([snap]) => snap,
            Err(snaps) => {
                return Err(ImageError::RepoDetailLen {
                    kind: artifact.kind,
                    name: artifact.name.clone(),
                    developer: developer.to_string(),
                    channel: artifact.channel.clone(),
                    count: snaps.len(),
                })
            }
        };

        self.store
            .download(&snap, &mut LogProgress::default())
            .map_err(|source| ImageError::RepoDownload {
                kind: artifact.kind,
                name: artifact.name.clone(),
                developer: developer.to_string(),
                channel: artifact.channel.clone(),
                source,
            })
    }

    fn flash(
        &self,
        strategy: FlashStrategy,
        options: &BuildOptions,
        version: u64,
        raw: &Path,
    ) -> Result<(), ImageError> {
        info!(?strategy, release = %options.release, version, "flashing raw image");
        self.cli
            .exec_command(&strategy.args(options, version, raw))?;
        Ok(())
    }

    fn convert(&self, compat: &str, raw: &Path, output: &Path) -> Result<(), ImageError> {
        info!(output = %output.display(), "converting to qcow2");
        self.cli.exec_command(&[
            QEMU_IMG.to_string(),
            "convert".to_string(),
            "-O".to_string(),
            "qcow2".to_string(),
            "-o".to_string(),
            format!("compat={compat}"),
            raw.display().to_string(),
            output.display().to_string(),
        ])?;
        Ok(())
    }
}

impl<C: CliCommander, S: StoreClient> Driver for UdfQcow2<C, S> {
    fn create(&self, options: &BuildOptions, version: u64) -> Result<PathBuf, ImageError> {
        let strategy = FlashStrategy::for_release(&options.release);
        let workspace = self.make_workspace()?;

        for artifact in ArtifactRef::all(options) {
            let path = self.fetch(&artifact).inspect_err(|e| warn!("{e}"))?;
            debug!(kind = %artifact.kind, path = %path.display(), "fetched snap");
        }

        let raw = workspace.join(RAW_OUTPUT_FILE_NAME);
        let output = workspace.join(OUTPUT_FILE_NAME);
        self.flash(strategy, options, version, &raw)?;
        self.convert(&options.qcow2_compat, &raw, &output)?;

        info!(path = %output.display(), version, "image ready");
        Ok(output)
    }
}
