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

use bytes::Bytes;
use mdimg_core::{Context, Result};
use mdimg_http_send_reqwest::ReqwestHttpSend;
use reqwest::Client;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("mdimg-example/0.1")
        .build()
        .map_err(|e| mdimg_core::Error::config_invalid("invalid client").with_source(e))?;

    let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));

    // The url resolver endpoint needs no credential.
    let req = http::Request::get("https://api.juejin.cn/imagex/get_img_url?uri=tos-cn-i-k3u1fbpfcp/example")
        .body(Bytes::new())?;

    let resp = ctx.http_send_as_string(req).await?;
    println!("status: {}", resp.status());
    println!("body: {}", resp.body());
    Ok(())
}
