//! Build and publish versioned Ubuntu Core cloud images.
//!
//! The crate drives external tools only; it implements neither the image
//! registry nor the snap store protocols.
//!
//! - **Registry client** ([`cloud`]) - finds the latest published version of
//!   a (release, channel, arch) triple and uploads new images
//! - **Image driver** ([`image`]) - fetches the os, kernel and gadget snaps,
//!   flashes a raw disk with `ubuntu-device-flash` and converts it to qcow2
//! - **Pipeline** ([`pipeline`]) - ties both together around one version
//!
//! # Example
//!
//! ```rust,ignore
//! use snappy_cloud_image::cloud::Client;
//! use snappy_cloud_image::image::{store::SnapStore, UdfQcow2};
//! use snappy_cloud_image::process::ShellCommander;
//! use snappy_cloud_image::{pipeline, BuildOptions};
//!
//! let options = BuildOptions::default().validate()?;
//! let client = Client::new(ShellCommander);
//! let driver = UdfQcow2::new(ShellCommander, SnapStore::new(ShellCommander));
//! let name = pipeline::create_and_publish(&client, &driver, &options)?;
//! ```

pub mod cli;
pub mod cloud;
pub mod config;
pub mod image;
pub mod logging;
pub mod options;
pub mod pipeline;
pub mod preflight;
pub mod process;

pub use options::BuildOptions;
