//! Snap store access through the `snap` CLI.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::process::{CliCommander, ExecError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("parsing snap info output: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A snap as published in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnap {
    pub name: String,
    pub developer: String,
    pub channel: String,
}

impl RemoteSnap {
    /// Local file name a download of this snap is stored under.
    pub fn filename(&self) -> String {
        format!("{}_{}.snap", self.name, self.channel)
    }
}

/// Receives download progress.
pub trait Progress {
    fn start(&mut self, label: &str);
    fn finish(&mut self);
}

/// Discards progress.
#[derive(Debug, Default)]
pub struct NullProgress;

impl Progress for NullProgress {
    fn start(&mut self, _label: &str) {}
    fn finish(&mut self) {}
}

/// Logs the start and end of each download.
#[derive(Debug, Default)]
pub struct LogProgress {
    current: Option<String>,
}

impl Progress for LogProgress {
    fn start(&mut self, label: &str) {
        info!("downloading {label}");
        self.current = Some(label.to_string());
    }

    fn finish(&mut self) {
        if let Some(label) = self.current.take() {
            info!("downloaded {label}");
        }
    }
}

/// Package store used to fetch the os, kernel and gadget snaps.
pub trait StoreClient {
    /// Snaps matching `name` in `channel`. `developer` narrows the match
    /// when not empty.
    fn details(
        &self,
        name: &str,
        developer: &str,
        channel: &str,
    ) -> Result<Vec<RemoteSnap>, StoreError>;

    /// Download `snap`, returning the local path.
    fn download(
        &self,
        snap: &RemoteSnap,
        progress: &mut dyn Progress,
    ) -> Result<PathBuf, StoreError>;
}

/// [`StoreClient`] driving `snap info` and `snap download`.
pub struct SnapStore<C> {
    cli: C,
}

impl<C: CliCommander> SnapStore<C> {
    pub fn new(cli: C) -> Self {
        Self { cli }
    }
}

impl<C: CliCommander> StoreClient for SnapStore<C> {
    fn details(
        &self,
        name: &str,
        developer: &str,
        channel: &str,
    ) -> Result<Vec<RemoteSnap>, StoreError> {
        let output = self.cli.exec_command(&[
            "snap".to_string(),
            "info".to_string(),
            name.to_string(),
        ])?;
        parse_info(&output, developer, channel)
    }

    fn download(
        &self,
        snap: &RemoteSnap,
        progress: &mut dyn Progress,
    ) -> Result<PathBuf, StoreError> {
        let basename = format!("{}_{}", snap.name, snap.channel);
        progress.start(&snap.filename());
        self.cli.exec_command(&[
            "snap".to_string(),
            "download".to_string(),
            format!("--channel={}", snap.channel),
            format!("--basename={basename}"),
            snap.name.clone(),
        ])?;
        progress.finish();
        Ok(PathBuf::from(snap.filename()))
    }
}

/// Channel values snapd prints for a closed channel.
const CLOSED_CHANNEL_MARKERS: &[&str] = &["–", "--"];

/// One document of `snap info` output. Unlisted keys are ignored.
#[derive(Debug, Deserialize)]
struct SnapInfo {
    name: String,
    #[serde(default, alias = "developer")]
    publisher: Option<String>,
    #[serde(default)]
    channels: BTreeMap<String, Option<String>>,
}

impl SnapInfo {
    /// Whether `channel` is open, either exactly (`edge`) or as the risk of
    /// a track (`latest/edge`).
    fn publishes(&self, channel: &str) -> bool {
        let suffix = format!("/{channel}");
        self.channels.iter().any(|(key, value)| {
            (key == channel || key.ends_with(&suffix))
                && value
                    .as_deref()
                    .is_some_and(|v| !CLOSED_CHANNEL_MARKERS.contains(&v.trim()))
        })
    }

    fn published_by(&self, developer: &str) -> bool {
        developer.is_empty()
            || self
                .publisher
                .as_deref()
                .is_some_and(|p| p.trim_end_matches('✓') == developer)
    }
}

/// Parse `snap info` output (one YAML document per snap) into the snaps
/// that publish `channel`.
fn parse_info(output: &str, developer: &str, channel: &str) -> Result<Vec<RemoteSnap>, StoreError> {
    let mut snaps = Vec::new();
    for document in serde_yaml::Deserializer::from_str(output) {
        let info = SnapInfo::deserialize(document)?;
        if info.publishes(channel) && info.published_by(developer) {
            snaps.push(RemoteSnap {
                name: info.name,
                developer: developer.to_string(),
                channel: channel.to_string(),
            });
        }
    }
    Ok(snaps)
}
