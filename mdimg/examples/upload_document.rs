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

use mdimg::imagex::Config;
use mdimg::{default_context_with_timeout, process_document, Result};
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        println!("usage: upload_document <markdown path>");
        return Ok(());
    };

    // Give up on any single request after a minute
    let ctx = default_context_with_timeout(Duration::from_secs(60))?;

    // Session id comes from MDIMG_SESSION_ID
    let config = Config::default().from_env(&ctx);

    let report = process_document(&ctx, config, &path).await?;
    for (original, replacement) in report.pairs() {
        println!("{original} -> {replacement}");
    }
    if report.failed() > 0 {
        println!("{} images failed to upload", report.failed());
    }

    Ok(())
}
