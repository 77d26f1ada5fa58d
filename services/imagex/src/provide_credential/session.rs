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

use crate::constants::SESSION_COOKIE;
use crate::utils::{endpoint_with_query, parse_json};
use crate::{Config, Credential};
use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Method};
use log::debug;
use mdimg_core::utils::Redact;
use mdimg_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;
use std::sync::Arc;

/// SessionCredentialProvider exchanges a user session for storage credentials.
///
/// The session id is sent as the `sessionid` cookie to the token endpoint,
/// which answers with a json envelope:
///
/// ```json
/// {"err_no": 0, "err_msg": "success", "data": {"token": {"AccessKeyID": "...", "SecretAccessKey": "...", "SessionToken": "..."}}}
/// ```
#[derive(Debug)]
pub struct SessionCredentialProvider {
    config: Arc<Config>,
}

impl SessionCredentialProvider {
    /// Create a new `SessionCredentialProvider` instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProvideCredential for SessionCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(session_id) = &self.config.session_id else {
            return Err(Error::config_invalid(
                "session id is required to request an upload token",
            ));
        };

        let uri = endpoint_with_query(&self.config.token_endpoint, &[("client", "web")])?;
        debug!(
            "requesting upload token from {uri} with session {:?}",
            Redact::from(session_id)
        );

        let mut cookie = format!("{SESSION_COOKIE}={session_id}").parse::<http::HeaderValue>()?;
        cookie.set_sensitive(true);

        let req = http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Bytes::new())
            .map_err(|e| Error::request_invalid("failed to build token request").with_source(e))?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != http::StatusCode::OK {
            return Err(Error::transport(format!(
                "request to token endpoint failed: status={}, body={}",
                resp.status(),
                resp.body()
            )));
        }

        let envelope: TokenEnvelope = parse_json(resp.body())?;
        if envelope.err_no != 0 {
            return Err(Error::credential_denied(format!(
                "failed to get upload token: {}, please check the session id",
                envelope.err_msg
            )));
        }

        let token = envelope
            .data
            .and_then(|mut data| data.get_mut("token").map(serde_json::Value::take))
            .ok_or_else(|| Error::credential_invalid("token object is missing from response"))?;
        let cred: Credential = serde_json::from_value(token).map_err(|e| {
            Error::credential_invalid("failed to decode upload token").with_source(e)
        })?;

        debug!("got upload token: {cred:?}");
        Ok(Some(cred))
    }
}

#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    err_no: i64,
    #[serde(default)]
    err_msg: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}
