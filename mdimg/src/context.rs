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

use mdimg_core::{Context, OsEnv, Result};
use mdimg_file_read_tokio::TokioFileRead;
use mdimg_http_send_reqwest::ReqwestHttpSend;
use std::time::Duration;

/// Create a context reading files with tokio, sending requests with reqwest
/// and reading the process env.
///
/// Requests never time out, they block until the transport completes or fails.
pub fn default_context() -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
}

/// Same as [`default_context`] but every request fails after `timeout`.
///
/// Errors if the http client cannot be built with the timeout.
pub fn default_context_with_timeout(timeout: Duration) -> Result<Context> {
    Ok(default_context().with_http_send(ReqwestHttpSend::with_timeout(timeout)?))
}
