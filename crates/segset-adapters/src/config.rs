//! Configuration file support for segset datasets.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/segset/config.toml` (lowest priority)
//! - Project-local: `.segset.toml` (searched up directory tree)
//! - An explicit file passed by the caller (highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use segset_core::indexing::{DuplicatePolicy, IndexOptions, ListingOrder};
use segset_core::{
    select_device, DatasetError, DevicePreference, ImageDataset, LoaderOptions, Normalize,
    ResizeFilter, ResizeToTensor, Result, Transform,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::fs::LocalImageDataset;
use crate::remote::{RemoteImageDataset, RemoteOptions};
use crate::s3::{S3Client, S3Config, S3Location, ServerSideEncryption, DEFAULT_ENDPOINT};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Where images come from.
    pub source: SourceConfig,
    /// Entry ordering and collision handling.
    pub index: IndexConfig,
    /// Object store settings.
    pub s3: S3Section,
    /// Stock resize transform.
    pub transform: TransformConfig,
    /// Batch driver settings.
    pub loader: LoaderConfig,
}

/// Source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local directory.
    Local,
    /// S3-compatible bucket.
    S3,
}

/// Source configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Explicit kind; inferred from `dir`/`url` when absent.
    pub kind: Option<SourceKind>,
    /// Local directory.
    pub dir: Option<PathBuf>,
    /// Remote location, `s3://bucket/prefix`.
    pub url: Option<String>,
}

impl SourceConfig {
    /// Returns true if no source field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kind.is_none() && self.dir.is_none() && self.url.is_none()
    }
}

/// Index configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// `sorted` or `discovery`.
    pub order: Option<ListingOrder>,
    /// `allow` or `reject`.
    pub duplicates: Option<DuplicatePolicy>,
}

/// Object store configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct S3Section {
    /// Endpoint URL.
    pub endpoint: Option<String>,
    /// `true`, `false`, `"AES256"`, or `"aws:kms"`.
    pub encryption_at_rest: Option<ServerSideEncryption>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Directory for per-access staging files.
    pub staging_dir: Option<PathBuf>,
}

/// Resize transform configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Output width in pixels.
    pub width: Option<u32>,
    /// Output height in pixels.
    pub height: Option<u32>,
    /// Resampling filter.
    pub filter: Option<ResizeFilter>,
    /// Channel means for normalisation.
    pub mean: Option<[f32; 3]>,
    /// Channel standard deviations for normalisation.
    pub std: Option<[f32; 3]>,
    /// `cpu` or `auto` (Metal/CUDA when built in and available).
    pub device: Option<DevicePreference>,
}

/// Batch driver configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Items per batch.
    pub batch_size: Option<usize>,
    /// Shuffle index order.
    pub shuffle: Option<bool>,
    /// Shuffle seed.
    pub seed: Option<u64>,
    /// Drop a short trailing batch.
    pub drop_last: Option<bool>,
}

impl DatasetConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/segset/config.toml`
    /// 2. Project-local: `.segset.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Unparsable files and invalid
    /// values are logged as warnings.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            warn!("{e}");
        }

        config
    }

    /// Layered load plus an explicit file on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file cannot be read or parsed, or if
    /// the merged configuration is invalid.
    pub fn load_with(explicit: &Path) -> Result<Self> {
        let mut config = Self::load();
        config.merge(Self::from_file(explicit)?);
        config.validate()?;
        Ok(config)
    }

    /// Parses a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DatasetError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| DatasetError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Validate configuration values are within acceptable ranges.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DatasetError::Config(msg));

        if let (Some(dir), Some(url)) = (&self.source.dir, &self.source.url) {
            if self.source.kind.is_none() {
                return invalid(format!(
                    "source.dir ({}) and source.url ({url}) both set; set source.kind",
                    dir.display()
                ));
            }
        }
        if let Some(url) = &self.source.url {
            S3Location::parse(url)?;
        }

        if self.transform.width == Some(0) || self.transform.height == Some(0) {
            return invalid("transform.width and transform.height must be non-zero".into());
        }
        if self.transform.width.is_some() != self.transform.height.is_some() {
            return invalid("transform.width and transform.height must be set together".into());
        }
        if self.transform.mean.is_some() != self.transform.std.is_some() {
            return invalid("transform.mean and transform.std must be set together".into());
        }
        if let Some(std) = self.transform.std {
            if std.iter().any(|s| *s <= 0.0) {
                return invalid(format!("transform.std must be positive, got {std:?}"));
            }
        }

        if self.loader.batch_size == Some(0) {
            return invalid("loader.batch_size must be at least 1".into());
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    ///
    /// `[source]` is replaced as a whole: a layer naming any of `kind`, `dir`
    /// or `url` describes the complete source.
    pub fn merge(&mut self, other: Self) {
        // Source
        if !other.source.is_empty() {
            self.source = other.source;
        }

        // Index
        self.index.order = other.index.order.or(self.index.order);
        self.index.duplicates = other.index.duplicates.or(self.index.duplicates);

        // S3
        self.s3.endpoint = other.s3.endpoint.or_else(|| self.s3.endpoint.take());
        self.s3.encryption_at_rest = other.s3.encryption_at_rest.or(self.s3.encryption_at_rest);
        self.s3.connect_timeout_secs = other
            .s3
            .connect_timeout_secs
            .or(self.s3.connect_timeout_secs);
        self.s3.request_timeout_secs = other
            .s3
            .request_timeout_secs
            .or(self.s3.request_timeout_secs);
        self.s3.staging_dir = other.s3.staging_dir.or_else(|| self.s3.staging_dir.take());

        // Transform
        self.transform.width = other.transform.width.or(self.transform.width);
        self.transform.height = other.transform.height.or(self.transform.height);
        self.transform.filter = other.transform.filter.or(self.transform.filter);
        self.transform.mean = other.transform.mean.or(self.transform.mean);
        self.transform.std = other.transform.std.or(self.transform.std);
        self.transform.device = other.transform.device.or(self.transform.device);

        // Loader
        self.loader.batch_size = other.loader.batch_size.or(self.loader.batch_size);
        self.loader.shuffle = other.loader.shuffle.or(self.loader.shuffle);
        self.loader.seed = other.loader.seed.or(self.loader.seed);
        self.loader.drop_last = other.loader.drop_last.or(self.loader.drop_last);
    }

    /// Resolved source kind: explicit, else `url` means S3 and `dir` local.
    #[must_use]
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source.kind.or_else(|| {
            if self.source.url.is_some() {
                Some(SourceKind::S3)
            } else if self.source.dir.is_some() {
                Some(SourceKind::Local)
            } else {
                None
            }
        })
    }

    /// Index options with defaults filled in.
    #[must_use]
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            order: self.index.order.unwrap_or_default(),
            duplicates: self.index.duplicates.unwrap_or_default(),
        }
    }

    /// Loader options with defaults filled in.
    #[must_use]
    pub fn loader_options(&self) -> LoaderOptions {
        let defaults = LoaderOptions::default();
        LoaderOptions {
            batch_size: self.loader.batch_size.unwrap_or(defaults.batch_size),
            shuffle: self.loader.shuffle.unwrap_or(defaults.shuffle),
            seed: self.loader.seed.or(defaults.seed),
            drop_last: self.loader.drop_last.unwrap_or(defaults.drop_last),
        }
    }

    /// Client config for `bucket` with defaults filled in.
    #[must_use]
    pub fn s3_config(&self, bucket: &str) -> S3Config {
        S3Config {
            endpoint: self
                .s3
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            bucket: bucket.to_string(),
            encryption: self.s3.encryption_at_rest.unwrap_or_default(),
            connect_timeout: self.s3.connect_timeout_secs.map(Duration::from_secs),
            request_timeout: self.s3.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// The configured resize transform, if `width` and `height` are set.
    #[must_use]
    pub fn resize_transform(&self) -> Option<ResizeToTensor> {
        let (width, height) = (self.transform.width?, self.transform.height?);
        let mut transform = ResizeToTensor::new(width, height)
            .with_filter(self.transform.filter.unwrap_or_default());
        if let (Some(mean), Some(std)) = (self.transform.mean, self.transform.std) {
            transform = transform.with_normalize(Normalize { mean, std });
        }
        if let Some(preference) = self.transform.device {
            transform = transform.with_device(select_device(preference));
        }
        Some(transform)
    }
}

/// Opens the configured source with a caller-supplied transform.
///
/// # Errors
///
/// Returns [`DatasetError::Config`] if no source is configured, or any error
/// from scanning the directory or listing the bucket.
pub fn open_dataset(
    config: &DatasetConfig,
    transform: impl Transform + 'static,
) -> Result<Box<dyn ImageDataset>> {
    config.validate()?;

    match config.source_kind() {
        Some(SourceKind::Local) => {
            let dir = config
                .source
                .dir
                .clone()
                .ok_or_else(|| {
                    DatasetError::Config("source.kind = 'local' needs source.dir".into())
                })?;
            let dataset = LocalImageDataset::open(dir, transform, config.index_options())?;
            Ok(Box::new(dataset))
        }
        Some(SourceKind::S3) => {
            let url = config
                .source
                .url
                .as_deref()
                .ok_or_else(|| DatasetError::Config("source.kind = 's3' needs source.url".into()))?;
            let location = S3Location::parse(url)?;
            let client = S3Client::new(config.s3_config(&location.bucket))?;
            let options = RemoteOptions {
                index: config.index_options(),
                staging_dir: config.s3.staging_dir.clone(),
            };
            let dataset = RemoteImageDataset::open(client, location.prefix, transform, options)?;
            Ok(Box::new(dataset))
        }
        None => Err(DatasetError::Config(
            "no source configured; set source.dir or source.url".into(),
        )),
    }
}

/// Opens the configured source with the configured resize transform.
///
/// # Errors
///
/// Returns [`DatasetError::Config`] if `[transform]` lacks a size, plus any
/// error from [`open_dataset`].
pub fn open_configured_dataset(config: &DatasetConfig) -> Result<Box<dyn ImageDataset>> {
    let transform = config.resize_transform().ok_or_else(|| {
        DatasetError::Config("transform.width and transform.height are required".into())
    })?;
    open_dataset(config, transform)
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("segset").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.segset.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".segset.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file, logging failures.
fn load_file(path: &Path) -> Option<DatasetConfig> {
    match DatasetConfig::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Skipping config file: {e}");
            None
        }
    }
}
