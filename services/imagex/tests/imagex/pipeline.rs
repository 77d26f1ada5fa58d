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
use http::{header, Method};
use mdimg_core::ErrorKind;
use mdimg_imagex::{Config, StaticCredentialProvider, UploadPipeline};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn write_image(dir: &TempDir, name: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, b"123456789").expect("write image must succeed");
    path.to_string_lossy().to_string()
}

fn pipeline(http: &MockHttpSend) -> UploadPipeline {
    UploadPipeline::new(
        context(http.clone()),
        Config::default().with_session_id(SESSION_ID),
    )
}

#[tokio::test]
async fn test_single_image_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "a.png");

    let http = uploading("a", "https://cdn/x?");
    let report = pipeline(&http)
        .run(&strings(&["./a.png"]), &[path])
        .await
        .expect("run must succeed");

    assert_eq!(report.replacements(), strings(&["https://cdn/x"]));
    assert_eq!(report.failed(), 0);
    assert!(report.outcomes()[0].is_success());

    let token = http.requests_to(TOKEN_URL);
    assert_eq!(token.len(), 1);
    assert_eq!(token[0].uri, format!("{TOKEN_URL}?client=web"));
    assert_eq!(
        token[0].headers[header::COOKIE],
        format!("sessionid={SESSION_ID}").as_str()
    );
    assert_eq!(http.requests_to(&resolve_prefix("a")).len(), 1);
}

#[tokio::test]
async fn test_failed_image_keeps_original_reference() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        write_image(&dir, "a.png"),
        write_image(&dir, "b.png"),
        write_image(&dir, "c.png"),
    ];

    let http = MockHttpSend::new()
        .route(Method::GET, TOKEN_URL, token_reply())
        .route(Method::GET, APPLY_URL, apply_reply("a"))
        .route(Method::GET, APPLY_URL, apply_reply("b"))
        .route(Method::GET, APPLY_URL, apply_reply("c"))
        .route(
            Method::POST,
            &format!("{UPLOAD_URL}{}", store_uri("b")),
            Reply::Fail,
        )
        .route(Method::POST, UPLOAD_URL, put_reply())
        .route(Method::POST, COMMIT_URL, commit_reply())
        .route(Method::GET, &resolve_prefix("a"), resolve_reply("https://cdn/a"))
        .route(Method::GET, &resolve_prefix("c"), resolve_reply("https://cdn/c"));

    let originals = strings(&["./a.png", "./b.png", "./c.png"]);
    let report = pipeline(&http)
        .run(&originals, &paths)
        .await
        .expect("run must succeed");

    assert_eq!(
        report.replacements(),
        strings(&["https://cdn/a", "./b.png", "https://cdn/c"])
    );
    assert_eq!(report.failed(), 1);

    let err = report.outcomes()[1].error.as_ref().unwrap();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.operation(), Some("put"));

    // Every image gets its own slot, the token is shared.
    assert_eq!(http.requests_to(APPLY_URL).len(), 3);
    assert_eq!(http.requests_to(COMMIT_URL).len(), 2);
    assert_eq!(http.requests_to(TOKEN_URL).len(), 1);
}

#[tokio::test]
async fn test_missing_file_makes_no_request() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");
    assert!(!Path::new(&missing).exists());

    let http = uploading("a", "https://cdn/a");
    let report = pipeline(&http)
        .run(
            &strings(&["./missing.png"]),
            &[missing.to_string_lossy().to_string()],
        )
        .await
        .expect("run must succeed");

    assert_eq!(report.replacements(), strings(&["./missing.png"]));
    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.outcomes()[0].error.as_ref().unwrap().kind(),
        ErrorKind::FileAccess
    );
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_output_matches_input_length_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let present = write_image(&dir, "a.png");
    let missing = dir.path().join("nope.png").to_string_lossy().to_string();

    let http = uploading("a", "https://cdn/a");
    let originals = strings(&["./nope.png", "./a.png", "", "./nope.png"]);
    let paths = vec![missing.clone(), present, String::new(), missing];
    let report = pipeline(&http)
        .run(&originals, &paths)
        .await
        .expect("run must succeed");

    assert_eq!(
        report.replacements(),
        strings(&["./nope.png", "https://cdn/a", "", "./nope.png"])
    );
    assert_eq!(report.failed(), 3);
}

#[tokio::test]
async fn test_denied_token_is_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![write_image(&dir, "a.png"), write_image(&dir, "b.png")];

    let http = MockHttpSend::new().route(Method::GET, TOKEN_URL, token_denied_reply());
    let report = pipeline(&http)
        .run(&strings(&["./a.png", "./b.png"]), &paths)
        .await
        .expect("run must succeed");

    assert_eq!(report.replacements(), strings(&["./a.png", "./b.png"]));
    assert_eq!(report.failed(), 2);
    for outcome in report.outcomes() {
        let err = outcome.error.as_ref().unwrap();
        assert_eq!(err.kind(), ErrorKind::CredentialDenied);
        assert!(err.message().contains("must login"));
    }
    assert_eq!(http.requests_to(TOKEN_URL).len(), 1);
    assert!(http.requests_to(APPLY_URL).is_empty());
}

#[tokio::test]
async fn test_each_run_fetches_its_own_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "a.png");

    let http = uploading("a", "https://cdn/a");
    let pipeline = pipeline(&http);
    for _ in 0..2 {
        let report = pipeline
            .run(&strings(&["./a.png"]), &[path.clone()])
            .await
            .expect("run must succeed");
        assert_eq!(report.failed(), 0);
    }

    assert_eq!(http.requests_to(TOKEN_URL).len(), 2);
}

#[tokio::test]
async fn test_static_credential_skips_token_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "a.png");

    let http = uploading("a", "https://cdn/a");
    let report = UploadPipeline::new(context(http.clone()), Config::default())
        .with_credential_provider(StaticCredentialProvider::new("AKLTak", "sk", "STS2st"))
        .run(&strings(&["./a.png"]), &[path])
        .await
        .expect("run must succeed");

    assert_eq!(report.replacements(), strings(&["https://cdn/a"]));
    assert!(http.requests_to(TOKEN_URL).is_empty());
}

#[tokio::test]
async fn test_mismatched_lengths_abort_the_run() {
    let http = MockHttpSend::new();
    let err = pipeline(&http)
        .run(&strings(&["./a.png"]), &[])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert!(http.requests().is_empty());
}
