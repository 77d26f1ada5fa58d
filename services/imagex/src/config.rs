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

use std::fmt::{Debug, Formatter};

use mdimg_core::utils::Redact;
use mdimg_core::{Context, Error, Result};

use crate::constants::*;

/// Config for imagex uploads.
#[derive(Clone)]
pub struct Config {
    /// `session_id` is the user session exchanged for storage credentials,
    /// loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: [`MDIMG_SESSION_ID`]
    pub session_id: Option<String>,
    /// `service_id` will be loaded from:
    ///
    /// - env value: [`MDIMG_IMAGEX_SERVICE_ID`]
    /// - default to `k3u1fbpfcp`
    pub service_id: String,
    /// `region` will be loaded from:
    ///
    /// - env value: [`MDIMG_IMAGEX_REGION`]
    /// - default to `cn-north-1`
    pub region: String,
    /// `token_endpoint` will be loaded from:
    ///
    /// - env value: [`MDIMG_TOKEN_ENDPOINT`]
    /// - default to `https://api.juejin.cn/imagex/gen_token`
    pub token_endpoint: String,
    /// `api_endpoint` is the imagex control plane, loaded from:
    ///
    /// - env value: [`MDIMG_IMAGEX_ENDPOINT`]
    /// - default to `https://imagex.bytedanceapi.com/`
    pub api_endpoint: String,
    /// `resolve_endpoint` turns a store uri into a public url, loaded from:
    ///
    /// - env value: [`MDIMG_RESOLVE_ENDPOINT`]
    /// - default to `https://api.juejin.cn/imagex/get_img_url`
    pub resolve_endpoint: String,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "session_id",
                &self.session_id.as_deref().map(Redact::from),
            )
            .field("service_id", &self.service_id)
            .field("region", &self.region)
            .field("token_endpoint", &self.token_endpoint)
            .field("api_endpoint", &self.api_endpoint)
            .field("resolve_endpoint", &self.resolve_endpoint)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_id: None,
            service_id: SERVICE_ID.to_string(),
            region: REGION.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            api_endpoint: IMAGEX_ENDPOINT.to_string(),
            resolve_endpoint: RESOLVE_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Set the session id.
    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Load config from env.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        if self.session_id.is_none() {
            if let Some(v) = envs.get(MDIMG_SESSION_ID) {
                self.session_id = Some(v.to_string());
            }
        }
        if let Some(v) = envs.get(MDIMG_IMAGEX_SERVICE_ID) {
            self.service_id = v.to_string();
        }
        if let Some(v) = envs.get(MDIMG_IMAGEX_REGION) {
            self.region = v.to_string();
        }
        if let Some(v) = envs.get(MDIMG_TOKEN_ENDPOINT) {
            self.token_endpoint = v.to_string();
        }
        if let Some(v) = envs.get(MDIMG_IMAGEX_ENDPOINT) {
            self.api_endpoint = v.to_string();
        }
        if let Some(v) = envs.get(MDIMG_RESOLVE_ENDPOINT) {
            self.resolve_endpoint = v.to_string();
        }

        self
    }

    /// Check that the session id is 32 ascii letters or digits.
    pub fn validate(&self) -> Result<()> {
        let Some(session_id) = &self.session_id else {
            return Err(Error::config_invalid("session id is required"));
        };

        if !is_valid_session_id(session_id) {
            return Err(Error::config_invalid(
                "session id must be 32 characters of letters and digits",
            ));
        }

        Ok(())
    }
}

fn is_valid_session_id(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
