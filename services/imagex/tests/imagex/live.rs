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

use log::warn;
use mdimg_core::{Context, OsEnv};
use mdimg_file_read_tokio::TokioFileRead;
use mdimg_http_send_reqwest::ReqwestHttpSend;
use mdimg_imagex::{Config, UploadPipeline};
use std::env;

fn init_live_context() -> Option<Context> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("MDIMG_IMAGEX_TEST").unwrap_or_default() != "on" {
        return None;
    }

    Some(
        Context::new()
            .with_file_read(TokioFileRead)
            .with_http_send(ReqwestHttpSend::default())
            .with_env(OsEnv),
    )
}

#[tokio::test]
async fn test_upload_real_image() {
    let Some(ctx) = init_live_context() else {
        warn!("MDIMG_IMAGEX_TEST is not set, skipped");
        return;
    };

    let image = env::var("MDIMG_IMAGEX_TEST_IMAGE").expect("env MDIMG_IMAGEX_TEST_IMAGE must set");
    let config = Config::default().from_env(&ctx);
    config.validate().expect("env MDIMG_SESSION_ID must be a valid session id");

    let report = UploadPipeline::new(ctx, config)
        .run(&[image.clone()], &[image])
        .await
        .expect("run must succeed");

    assert_eq!(report.failed(), 0, "upload failed: {:?}", report.outcomes());
    let url = report.outcomes()[0].url.as_deref().unwrap();
    assert!(url.starts_with("https://"), "unexpected url: {url}");
    assert!(!url.ends_with('?'));
}
