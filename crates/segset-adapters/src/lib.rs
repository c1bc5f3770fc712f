//! Segset Adapters - dataset sources for segset.
//!
//! This crate provides adapters for:
//! - Local directory datasets
//! - Object-store datasets with per-access temp file staging
//! - An S3-compatible client with encryption-at-rest checks
//! - Layered TOML configuration

pub mod config;
pub mod fs;
pub mod remote;
pub mod s3;

pub use config::{open_configured_dataset, open_dataset, DatasetConfig, SourceKind};
pub use fs::LocalImageDataset;
pub use remote::{RemoteImageDataset, RemoteOptions};
pub use s3::{S3Client, S3Config, S3Location, ServerSideEncryption};
