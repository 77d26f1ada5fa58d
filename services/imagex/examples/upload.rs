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

use mdimg_core::{Context, OsEnv, Result, Signer};
use mdimg_file_read_tokio::TokioFileRead;
use mdimg_http_send_reqwest::ReqwestHttpSend;
use mdimg_imagex::{Config, RequestSigner, StaticCredentialProvider, UploadPipeline};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging for debugging
    let _ = env_logger::builder().is_test(true).try_init();

    // Create context with Tokio file reader and reqwest HTTP client
    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);

    // Session id comes from MDIMG_SESSION_ID
    let config = Config::default().from_env(&ctx);

    let Some(image) = env::args().nth(1) else {
        println!("usage: upload <image path>");
        return Ok(());
    };

    if config.validate().is_err() {
        println!("MDIMG_SESSION_ID is not set, signing a demo apply request instead");

        let signer = Signer::new(
            ctx,
            StaticCredentialProvider::new("AKLTexample", "secret", "STS2example"),
            RequestSigner::new("imagex", "cn-north-1"),
        );
        let req = http::Request::get(
            "https://imagex.bytedanceapi.com/?Action=ApplyImageUpload&Version=2018-08-01&ServiceId=k3u1fbpfcp",
        )
        .body(())?;
        let (mut parts, _) = req.into_parts();
        signer.sign(&mut parts, None).await?;

        println!("Authorization: {}", parts.headers["authorization"].to_str()?);
        return Ok(());
    }

    let pipeline = UploadPipeline::new(ctx, config);
    let report = pipeline.run(&[image.clone()], &[image]).await?;
    for outcome in report.outcomes() {
        match &outcome.error {
            None => println!("{} -> {}", outcome.original, outcome.replacement()),
            Some(err) => println!("{} failed: {err}", outcome.original),
        }
    }

    Ok(())
}
