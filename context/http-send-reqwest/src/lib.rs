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

//! Reqwest-based HTTP client implementation for mdimg.
//!
//! This crate provides `ReqwestHttpSend`, which implements the `HttpSend`
//! trait from `mdimg_core` on top of a `reqwest::Client`.
//!
//! ## Example
//!
//! ```no_run
//! use mdimg_core::Context;
//! use mdimg_http_send_reqwest::ReqwestHttpSend;
//! use std::time::Duration;
//!
//! # fn main() -> mdimg_core::Result<()> {
//! let ctx = Context::new()
//!     .with_http_send(ReqwestHttpSend::with_timeout(Duration::from_secs(30))?);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use mdimg_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};
use std::time::Duration;

/// Reqwest-based implementation of the `HttpSend` trait.
///
/// Without a timeout every call blocks until the transport completes or fails.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a new ReqwestHttpSend whose calls fail after `timeout`.
    ///
    /// Returns `ConfigInvalid` if the client cannot be built, for example
    /// when the TLS backend fails to initialise.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::config_invalid(format!(
                    "failed to build http client with timeout {timeout:?}"
                ))
                .with_source(e)
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert http request").with_source(e))?;

        let resp = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::transport("failed to send http request").with_source(e))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::transport("failed to read http response body").with_source(e))?;

        let mut builder = http::Response::builder().status(status);
        if let Some(hs) = builder.headers_mut() {
            *hs = headers;
        }
        Ok(builder.body(body)?)
    }
}
