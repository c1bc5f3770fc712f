//! Integration tests for the S3 client against a local HTTP stub.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mockito::{Matcher, ServerGuard};
use segset_adapters::{RemoteImageDataset, RemoteOptions, S3Client, S3Config, ServerSideEncryption};
use segset_core::{DatasetError, ImageDataset, ImageDimensions, ObjectStore, ResizeToTensor};
use segset_test_support::SyntheticImageBuilder;

const SSE_HEADER: &str = "x-amz-server-side-encryption";

fn client(server: &ServerGuard, encryption: ServerSideEncryption) -> S3Client {
    let mut config = S3Config::new("bucket");
    config.endpoint = server.url();
    config.encryption = encryption;
    S3Client::new(config).expect("client")
}

fn listing(keys: &[&str], next_token: Option<&str>) -> String {
    let contents: String = keys
        .iter()
        .map(|k| format!("<Contents><Key>{k}</Key><Size>3</Size></Contents>"))
        .collect();
    let truncated = next_token.is_some();
    let token = next_token
        .map(|t| format!("<NextContinuationToken>{t}</NextContinuationToken>"))
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <ListBucketResult><Name>bucket</Name>\
         <IsTruncated>{truncated}</IsTruncated>{contents}{token}\
         <CommonPrefixes><Prefix>train/masks/</Prefix></CommonPrefixes>\
         </ListBucketResult>"
    )
}

#[test]
fn test_get_streams_encrypted_object() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/bucket/train/a.jpg")
        .with_header(SSE_HEADER, "AES256")
        .with_body("abc")
        .create();

    let mut sink = Vec::new();
    let bytes = client(&server, ServerSideEncryption::Aes256)
        .get_object_to("train/a.jpg", &mut sink)
        .unwrap();

    assert_eq!(bytes, 3);
    assert_eq!(sink, b"abc");
    mock.assert();
}

#[test]
fn test_get_missing_object_is_not_found() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bucket/train/gone.jpg")
        .with_status(404)
        .create();

    let mut sink = Vec::new();
    let err = client(&server, ServerSideEncryption::Aes256)
        .get_object_to("train/gone.jpg", &mut sink)
        .unwrap_err();

    let DatasetError::ResourceNotFound { location } = err else {
        panic!("expected ResourceNotFound, got {err:?}");
    };
    assert_eq!(location, "train/gone.jpg");
    assert!(sink.is_empty());
}

#[test]
fn test_unencrypted_object_is_rejected_before_writing() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bucket/train/a.jpg")
        .with_body("abc")
        .create();

    let mut sink = Vec::new();
    let err = client(&server, ServerSideEncryption::Aes256)
        .get_object_to("train/a.jpg", &mut sink)
        .unwrap_err();

    let DatasetError::Transfer { message, .. } = err else {
        panic!("expected Transfer, got {err:?}");
    };
    assert!(message.contains("AES256"));
    assert!(sink.is_empty());
}

#[test]
fn test_mismatched_encryption_is_rejected_before_writing() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bucket/train/a.jpg")
        .with_header(SSE_HEADER, "aws:kms")
        .with_body("abc")
        .create();

    let mut sink = Vec::new();
    let err = client(&server, ServerSideEncryption::Aes256)
        .get_object_to("train/a.jpg", &mut sink)
        .unwrap_err();

    let DatasetError::Transfer { message, .. } = err else {
        panic!("expected Transfer, got {err:?}");
    };
    assert!(message.contains("aws:kms"));
    assert!(sink.is_empty());
}

#[test]
fn test_disabled_policy_accepts_plain_objects() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bucket/train/a.jpg")
        .with_body("abc")
        .create();

    let mut sink = Vec::new();
    client(&server, ServerSideEncryption::None)
        .get_object_to("train/a.jpg", &mut sink)
        .unwrap();
    assert_eq!(sink, b"abc");
}

#[test]
fn test_server_error_is_retryable_transfer() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bucket/train/a.jpg")
        .with_status(503)
        .create();

    let mut sink = Vec::new();
    let err = client(&server, ServerSideEncryption::Aes256)
        .get_object_to("train/a.jpg", &mut sink)
        .unwrap_err();

    assert!(matches!(err, DatasetError::Transfer { .. }));
    assert!(err.is_retryable());
}

#[test]
fn test_listing_follows_continuation_token() {
    let mut server = mockito::Server::new();
    let first = server
        .mock("GET", "/bucket")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("list-type".into(), "2".into()),
            Matcher::UrlEncoded("delimiter".into(), "/".into()),
            Matcher::UrlEncoded("prefix".into(), "train/".into()),
        ]))
        .with_body(listing(&["train/a.jpg"], Some("tok-1")))
        .expect(1)
        .create();
    let second = server
        .mock("GET", "/bucket")
        .match_query(Matcher::UrlEncoded(
            "continuation-token".into(),
            "tok-1".into(),
        ))
        .with_body(listing(&["train/b.png", "train/notes.txt"], None))
        .expect(1)
        .create();

    let keys = client(&server, ServerSideEncryption::Aes256)
        .list("train/")
        .unwrap();

    assert_eq!(keys, ["train/a.jpg", "train/b.png", "train/notes.txt"]);
    first.assert();
    second.assert();
}

#[test]
fn test_listing_missing_bucket_is_not_found() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bucket")
        .match_query(Matcher::Any)
        .with_status(404)
        .create();

    let err = client(&server, ServerSideEncryption::Aes256)
        .list_objects("train/")
        .unwrap_err();
    assert!(matches!(err, DatasetError::ResourceNotFound { .. }));
}

#[test]
fn test_remote_dataset_over_s3() {
    let png = SyntheticImageBuilder::encode_png(&SyntheticImageBuilder::gradient(20, 10)).unwrap();

    let mut server = mockito::Server::new();
    server
        .mock("GET", "/bucket")
        .match_query(Matcher::Any)
        .with_body(listing(&["train/a.png", "train/b.png"], None))
        .create();
    server
        .mock("GET", "/bucket/train/a.png")
        .with_header(SSE_HEADER, "AES256")
        .with_body(png.clone())
        .create();
    server
        .mock("GET", "/bucket/train/b.png")
        .with_body(png)
        .create();

    let staging = tempfile::tempdir().unwrap();
    let options = RemoteOptions {
        staging_dir: Some(staging.path().to_path_buf()),
        ..RemoteOptions::default()
    };
    let dataset = RemoteImageDataset::open(
        client(&server, ServerSideEncryption::Aes256),
        "train",
        ResizeToTensor::new(8, 8),
        options,
    )
    .unwrap();

    assert_eq!(dataset.len(), 2);
    let item = dataset.get(0).unwrap();
    assert_eq!(item.meta.original_size, ImageDimensions::new(20, 10));
    assert!(matches!(dataset.get(1), Err(DatasetError::Transfer { .. })));
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}
