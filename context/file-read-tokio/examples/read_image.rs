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

use mdimg_core::hash::hex_crc32;
use mdimg_core::{Context, Result};
use mdimg_file_read_tokio::TokioFileRead;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let ctx = Context::new().with_file_read(TokioFileRead);

    let path = env::args().nth(1).unwrap_or_else(|| "image.png".to_string());

    let content = ctx.file_read(&path).await?;
    println!("{path}: {} bytes, crc32 {}", content.len(), hex_crc32(&content));
    Ok(())
}
