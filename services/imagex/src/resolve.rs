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

use crate::upload::Phase;
use crate::utils::{endpoint_with_query, parse_json};
use crate::Config;
use bytes::Bytes;
use http::Method;
use log::info;
use mdimg_core::{Context, Error, Result};
use serde::Deserialize;
use std::sync::Arc;

/// UrlResolver turns a store uri into the public url of the image.
///
/// The resolve endpoint is not signed.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    ctx: Context,
    config: Arc<Config>,
}

impl UrlResolver {
    /// Create a new resolver.
    pub fn new(ctx: Context, config: Arc<Config>) -> Self {
        Self { ctx, config }
    }

    /// Resolve the public url for `store_uri`.
    ///
    /// Trailing `?` are stripped from the returned url. Errors are tagged
    /// with the `resolve` phase.
    pub async fn resolve(&self, store_uri: &str) -> Result<String> {
        self.resolve_inner(store_uri)
            .await
            .map_err(|err| err.with_operation(Phase::Resolve.as_str()))
    }

    async fn resolve_inner(&self, store_uri: &str) -> Result<String> {
        let uri = endpoint_with_query(&self.config.resolve_endpoint, &[("uri", store_uri)])?;
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Bytes::new())
            .map_err(|e| Error::request_invalid("failed to build resolve request").with_source(e))?;

        let resp = self.ctx.http_send_as_string(req).await?;
        let body = resp.body();
        let resolved: ResolveResponse = parse_json(body)?;
        let Some(main_url) = resolved.data.and_then(|v| v.main_url) else {
            return Err(Error::protocol(format!(
                "failed to resolve image url: status={}, body={body}",
                resp.status()
            )));
        };

        let url = main_url.trim_end_matches('?').to_string();
        info!("got url: {url}");
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    data: Option<ResolveData>,
}

#[derive(Debug, Deserialize)]
struct ResolveData {
    #[serde(default)]
    main_url: Option<String>,
}
