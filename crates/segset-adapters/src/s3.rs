//! S3-compatible object store client.
//!
//! Blocking `reqwest` client speaking path-style S3 (`{endpoint}/{bucket}/{key}`).
//! Requests are unsigned, which suits anonymous buckets, presigning gateways,
//! and authenticating proxies; SDK-backed clients plug in through
//! [`ObjectStore`] instead.
//!
//! Every read enforces the configured server-side encryption policy: an
//! object whose `x-amz-server-side-encryption` header does not match is
//! rejected as a transfer failure before any bytes are written.
//!
//! The blocking client must not be created or dropped inside an async runtime.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use segset_core::{DatasetError, ObjectStore, Result};
use serde::Deserialize;
use tracing::debug;

/// Header carrying the encryption algorithm applied at rest.
const SSE_HEADER: &str = "x-amz-server-side-encryption";

/// Default endpoint (AWS, path-style).
pub const DEFAULT_ENDPOINT: &str = "https://s3.amazonaws.com";

/// Server-side encryption required of every object read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "EncryptionSetting")]
pub enum ServerSideEncryption {
    /// Accept objects regardless of encryption.
    None,
    /// Require SSE-S3 (`AES256`).
    #[default]
    Aes256,
    /// Require SSE-KMS (`aws:kms`).
    AwsKms,
}

impl ServerSideEncryption {
    /// Header value the store reports for this algorithm.
    #[must_use]
    pub const fn algorithm(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Aes256 => Some("AES256"),
            Self::AwsKms => Some("aws:kms"),
        }
    }

    /// Checks a response's encryption header against the policy.
    ///
    /// # Errors
    ///
    /// Returns a description of the violation if the header is missing or
    /// names a different algorithm.
    pub fn verify(self, reported: Option<&str>) -> std::result::Result<(), String> {
        let Some(required) = self.algorithm() else {
            return Ok(());
        };
        match reported {
            Some(actual) if actual == required => Ok(()),
            Some(actual) => Err(format!(
                "encryption mismatch: policy requires {required}, object is {actual}"
            )),
            None => Err(format!(
                "object is not encrypted at rest (policy requires {required})"
            )),
        }
    }
}

/// Raw config form: `true`, `false`, or an algorithm name.
#[derive(Deserialize)]
#[serde(untagged)]
enum EncryptionSetting {
    Enabled(bool),
    Algorithm(String),
}

impl TryFrom<EncryptionSetting> for ServerSideEncryption {
    type Error = String;

    fn try_from(raw: EncryptionSetting) -> std::result::Result<Self, Self::Error> {
        match raw {
            EncryptionSetting::Enabled(true) => Ok(Self::Aes256),
            EncryptionSetting::Enabled(false) => Ok(Self::None),
            EncryptionSetting::Algorithm(name) => match name.as_str() {
                "AES256" | "aes256" => Ok(Self::Aes256),
                "aws:kms" => Ok(Self::AwsKms),
                "none" => Ok(Self::None),
                other => Err(format!(
                    "unknown encryption_at_rest '{other}', \
                     expected true, false, 'AES256' or 'aws:kms'"
                )),
            },
        }
    }
}

/// A bucket plus key prefix, e.g. `s3://bucket/train/images/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix, empty or ending in `/`.
    pub prefix: String,
}

impl S3Location {
    /// Parses `s3://bucket/prefix` (scheme optional).
    ///
    /// The prefix is normalised to end in `/` so that listing returns the
    /// objects inside it rather than siblings sharing the name.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Config`] if the bucket name is empty.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url.strip_prefix("s3://").unwrap_or(url);
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(DatasetError::Config(format!("no bucket in '{url}'")));
        }

        let mut prefix = prefix.trim_start_matches('/').to_string();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix,
        })
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// Configuration for [`S3Client`].
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL.
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// Encryption policy enforced on reads.
    pub encryption: ServerSideEncryption,
    /// Connection timeout; `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Whole-request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl S3Config {
    /// Creates a config for `bucket` with default endpoint and policy.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            bucket: bucket.into(),
            encryption: ServerSideEncryption::default(),
            connect_timeout: None,
            request_timeout: None,
        }
    }
}

/// S3-compatible storage client bound to one bucket.
pub struct S3Client {
    client: Client,
    config: S3Config,
    endpoint: Url,
}

impl S3Client {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Config`] if the endpoint is not a valid base
    /// URL, or [`DatasetError::Transfer`] if the HTTP client cannot be built.
    pub fn new(config: S3Config) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            DatasetError::Config(format!("invalid endpoint '{}': {e}", config.endpoint))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(DatasetError::Config(format!(
                "endpoint '{}' cannot carry a path",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DatasetError::Transfer {
                location: config.endpoint.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Bucket this client reads from.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Encryption policy enforced on reads.
    #[must_use]
    pub const fn encryption(&self) -> ServerSideEncryption {
        self.config.encryption
    }

    /// Builds the URL for `key` (or the bucket root when `key` is `None`).
    fn url(&self, key: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.config.bucket);
            if let Some(key) = key {
                segments.extend(key.split('/'));
            }
        }
        url
    }

    fn transfer_error(location: &str, message: impl fmt::Display) -> DatasetError {
        DatasetError::Transfer {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    /// Lists object keys directly under `prefix`, following continuation
    /// tokens until the listing is complete.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::ResourceNotFound`] if the bucket does not
    /// exist, or [`DatasetError::Transfer`] on any other failure.
    pub fn list_objects(&self, prefix: &str) -> Result<Vec<String>> {
        let location = format!("s3://{}/{}", self.config.bucket, prefix);
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self.client.get(self.url(None)).query(&[
                ("list-type", "2"),
                ("delimiter", "/"),
                ("prefix", prefix),
            ]);
            if let Some(token) = &token {
                request = request.query(&[("continuation-token", token.as_str())]);
            }

            let resp = request
                .send()
                .map_err(|e| Self::transfer_error(&location, e))?;
            let status = resp.status();
            if status == StatusCode::NOT_FOUND {
                return Err(DatasetError::ResourceNotFound { location });
            }
            if !status.is_success() {
                let message = format!("list failed with status {status}");
                return Err(Self::transfer_error(&location, message));
            }

            let body = resp
                .text()
                .map_err(|e| Self::transfer_error(&location, e))?;
            let page = ListPage::parse(&body);
            debug!("Listed {} keys from {}", page.keys.len(), location);
            keys.extend(page.keys);

            match page.next_token {
                Some(next) if page.truncated => token = Some(next),
                _ => break,
            }
        }

        Ok(keys)
    }

    /// Streams the object at `key` into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::ResourceNotFound`] on 404, and
    /// [`DatasetError::Transfer`] for other failed statuses, transport
    /// errors, or an encryption policy violation.
    pub fn get_object_to(&self, key: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut resp = self
            .client
            .get(self.url(Some(key)))
            .send()
            .map_err(|e| Self::transfer_error(key, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DatasetError::ResourceNotFound {
                location: key.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Self::transfer_error(key, format!("get failed with status {status}")));
        }

        let reported = resp
            .headers()
            .get(SSE_HEADER)
            .and_then(|v| v.to_str().ok());
        self.config
            .encryption
            .verify(reported)
            .map_err(|message| Self::transfer_error(key, message))?;

        let bytes = resp
            .copy_to(sink)
            .map_err(|e| Self::transfer_error(key, e))?;
        debug!("Fetched {} ({} bytes)", key, bytes);
        Ok(bytes)
    }
}

impl ObjectStore for S3Client {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_objects(prefix)
    }

    fn fetch(&self, key: &str, sink: &mut dyn Write) -> Result<u64> {
        self.get_object_to(key, sink)
    }
}

/// One page of a ListObjectsV2 response.
#[derive(Debug, Default, PartialEq, Eq)]
struct ListPage {
    keys: Vec<String>,
    truncated: bool,
    next_token: Option<String>,
}

impl ListPage {
    /// Extracts keys and continuation state from the XML body.
    ///
    /// Common prefixes are carried in `<Prefix>` elements, so only object
    /// keys are collected.
    fn parse(body: &str) -> Self {
        let keys = body
            .split("<Key>")
            .skip(1)
            .filter_map(|part| part.find("</Key>").map(|end| xml_unescape(&part[..end])))
            .collect();

        let truncated = element(body, "IsTruncated").is_some_and(|v| v == "true");
        let next_token = element(body, "NextContinuationToken").map(xml_unescape);

        Self {
            keys,
            truncated,
            next_token,
        }
    }
}

/// Text of the first `<name>` element in `body`.
fn element<'a>(body: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = body.find(&open)? + open.len();
    let len = body[start..].find(&close)?;
    Some(&body[start..start + len])
}

fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
