// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use super::mock::*;
use bytes::Bytes;
use http::{header, Method};
use mdimg_core::{ErrorKind, Signer};
use mdimg_imagex::{
    Config, Credential, ImageUploader, RequestSigner, StaticCredentialProvider, UploadState,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn uploader(http: MockHttpSend) -> ImageUploader {
    let signer: Signer<Credential> = Signer::new(
        context(http),
        StaticCredentialProvider::new("AKLTak", "sk", "STS2st"),
        RequestSigner::new("imagex", "cn-north-1"),
    );
    ImageUploader::new(signer, Arc::new(Config::default()))
}

#[tokio::test]
async fn test_upload_runs_every_phase() {
    let http = uploading("a", "https://cdn/a");
    let slot = uploader(http.clone())
        .upload(Bytes::from_static(b"123456789"))
        .await
        .expect("upload must succeed");

    assert_eq!(slot.store_uri, "tos-cn-i-k3u1fbpfcp/a");
    assert_eq!(slot.session_key, "session-a");

    let requests = http.requests();
    assert_eq!(requests.len(), 3);

    let apply = &requests[0];
    assert_eq!(apply.method, Method::GET);
    assert_eq!(
        apply.uri,
        "https://imagex.bytedanceapi.com/?Action=ApplyImageUpload&Version=2018-08-01&ServiceId=k3u1fbpfcp"
    );
    let auth = apply.headers[header::AUTHORIZATION].to_str().unwrap();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKLTak/"));
    assert!(auth.contains("/cn-north-1/imagex/aws4_request, SignedHeaders=host;x-amz-date;x-amz-security-token, Signature="));
    assert_eq!(apply.headers["x-amz-security-token"], "STS2st");
    assert!(apply.headers.contains_key("x-amz-date"));

    let put = &requests[1];
    assert_eq!(put.method, Method::POST);
    assert_eq!(put.uri, "https://tos-d-x-lf.snssdk.com/tos-cn-i-k3u1fbpfcp/a");
    assert_eq!(put.headers[header::AUTHORIZATION], "SpaceKey/k3u1fbpfcp/a");
    assert_eq!(put.headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(put.headers["content-crc32"], "cbf43926");
    assert!(!put.headers.contains_key("x-amz-security-token"));
    assert_eq!(put.body, Bytes::from_static(b"123456789"));

    let commit = &requests[2];
    assert_eq!(commit.method, Method::POST);
    assert_eq!(
        commit.uri,
        "https://imagex.bytedanceapi.com/?Action=CommitImageUpload&Version=2018-08-01&SessionKey=session-a&ServiceId=k3u1fbpfcp"
    );
    assert!(commit.headers.contains_key(header::AUTHORIZATION));
}

#[tokio::test]
async fn test_advance_walks_the_state_machine() {
    let uploader = uploader(uploading("a", "https://cdn/a"));
    let content = Bytes::from_static(b"image");

    let state = uploader.advance(UploadState::Idle, &content).await;
    assert!(matches!(&state, UploadState::Applied(slot) if slot.store_uri == "tos-cn-i-k3u1fbpfcp/a"));

    let state = uploader.advance(state, &content).await;
    assert!(matches!(state, UploadState::Uploaded(_)));

    let state = uploader.advance(state, &content).await;
    assert!(matches!(state, UploadState::Committed(_)));
    assert!(state.is_terminal());

    // Terminal states stay where they are.
    let state = uploader.advance(state, &content).await;
    assert!(matches!(state, UploadState::Committed(_)));
}

#[tokio::test]
async fn test_apply_error_envelope() {
    let http = MockHttpSend::new().route(
        Method::GET,
        APPLY_URL,
        Reply::Json(
            200,
            r#"{"ResponseMetadata":{"Error":{"Code":"SignatureDoesNotMatch","Message":"bad signature"}}}"#
                .to_string(),
        ),
    );
    let err = uploader(http.clone())
        .upload(Bytes::from_static(b"image"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.operation(), Some("apply"));
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn test_apply_null_error_envelope() {
    let http = MockHttpSend::new()
        .route(
            Method::GET,
            APPLY_URL,
            Reply::Json(
                200,
                r#"{"ResponseMetadata":{"Error":null},"Result":{"UploadAddress":{"StoreInfos":[{"StoreUri":"a","Auth":"b"}],"UploadHosts":["tos-d-x-lf.snssdk.com"],"SessionKey":"k"}}}"#
                    .to_string(),
            ),
        )
        .route(Method::POST, UPLOAD_URL, put_reply());
    let err = uploader(http.clone())
        .upload(Bytes::from_static(b"image"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.operation(), Some("apply"));
    assert!(http.requests_to(UPLOAD_URL).is_empty());
}

#[tokio::test]
async fn test_apply_bad_status() {
    let http = MockHttpSend::new().route(
        Method::GET,
        APPLY_URL,
        Reply::Json(403, r#"{"ResponseMetadata":{}}"#.to_string()),
    );
    let err = uploader(http)
        .upload(Bytes::from_static(b"image"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.operation(), Some("apply"));
}

#[tokio::test]
async fn test_apply_without_upload_host() {
    let http = MockHttpSend::new().route(
        Method::GET,
        APPLY_URL,
        Reply::Json(
            200,
            r#"{"ResponseMetadata":{},"Result":{"UploadAddress":{"StoreInfos":[{"StoreUri":"a","Auth":"b"}],"UploadHosts":[],"SessionKey":"k"}}}"#
                .to_string(),
        ),
    );
    let err = uploader(http)
        .upload(Bytes::from_static(b"image"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.operation(), Some("apply"));
}

#[tokio::test]
async fn test_put_rejected_skips_commit() {
    let http = MockHttpSend::new()
        .route(Method::GET, APPLY_URL, apply_reply("a"))
        .route(
            Method::POST,
            UPLOAD_URL,
            Reply::Json(200, r#"{"success":2001,"error":{"code":2001}}"#.to_string()),
        )
        .route(Method::POST, COMMIT_URL, commit_reply());
    let err = uploader(http.clone())
        .upload(Bytes::from_static(b"image"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.operation(), Some("put"));
    assert!(http.requests_to(COMMIT_URL).is_empty());
}

#[tokio::test]
async fn test_put_transport_error() {
    let http = MockHttpSend::new()
        .route(Method::GET, APPLY_URL, apply_reply("a"))
        .route(Method::POST, UPLOAD_URL, Reply::Fail);
    let err = uploader(http)
        .upload(Bytes::from_static(b"image"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.operation(), Some("put"));
}

#[tokio::test]
async fn test_commit_error_envelope() {
    let http = MockHttpSend::new()
        .route(Method::GET, APPLY_URL, apply_reply("a"))
        .route(Method::POST, UPLOAD_URL, put_reply())
        .route(
            Method::POST,
            COMMIT_URL,
            Reply::Json(
                200,
                r#"{"ResponseMetadata":{"Error":{"Code":"InvalidSessionKey"}}}"#.to_string(),
            ),
        );
    let err = uploader(http)
        .upload(Bytes::from_static(b"image"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.operation(), Some("commit"));
}
