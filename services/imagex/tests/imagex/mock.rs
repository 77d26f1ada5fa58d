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

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use mdimg_core::{Context, Error, HttpSend, Result};
use mdimg_file_read_tokio::TokioFileRead;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const SESSION_ID: &str = "0123456789abcdef0123456789abcdef";
pub const TOKEN_URL: &str = "https://api.juejin.cn/imagex/gen_token";
pub const APPLY_URL: &str = "https://imagex.bytedanceapi.com/?Action=ApplyImageUpload";
pub const COMMIT_URL: &str = "https://imagex.bytedanceapi.com/?Action=CommitImageUpload";
pub const UPLOAD_URL: &str = "https://tos-d-x-lf.snssdk.com/";
pub const RESOLVE_URL: &str = "https://api.juejin.cn/imagex/get_img_url";

/// Canned answer of a route.
#[derive(Clone, Debug)]
pub enum Reply {
    Json(u16, String),
    Fail,
}

/// A request seen by the mock.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug)]
struct Route {
    method: Method,
    prefix: String,
    replies: VecDeque<Reply>,
}

/// MockHttpSend answers requests by matching method and url prefix.
///
/// Routes are tried in the order they were added. A route with several
/// replies hands them out in order and keeps repeating the last one.
#[derive(Clone, Debug, Default)]
pub struct MockHttpSend {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, method: Method, prefix: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.prefix == prefix)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    prefix: prefix.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.uri.starts_with(prefix))
            .collect()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let uri = parts.uri.to_string();
        self.requests.lock().unwrap().push(Recorded {
            method: parts.method.clone(),
            uri: uri.clone(),
            headers: parts.headers.clone(),
            body,
        });

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes
                .iter_mut()
                .find(|r| r.method == parts.method && uri.starts_with(&r.prefix))
                .ok_or_else(|| Error::transport(format!("no route for {} {uri}", parts.method)))?;
            if route.replies.len() > 1 {
                route.replies.pop_front().unwrap()
            } else {
                route.replies[0].clone()
            }
        };

        match reply {
            Reply::Json(status, body) => Ok(http::Response::builder()
                .status(status)
                .body(Bytes::from(body))?),
            Reply::Fail => Err(Error::transport("connection reset by peer")),
        }
    }
}

pub fn token_reply() -> Reply {
    Reply::Json(
        200,
        r#"{"err_no":0,"err_msg":"success","data":{"token":{"AccessKeyID":"AKLTak","SecretAccessKey":"sk","SessionToken":"STS2st","ExpiredTime":"2022-03-01T09:12:34+08:00"}}}"#
            .to_string(),
    )
}

pub fn token_denied_reply() -> Reply {
    Reply::Json(
        200,
        r#"{"err_no":403,"err_msg":"must login","data":null}"#.to_string(),
    )
}

pub fn store_uri(name: &str) -> String {
    format!("tos-cn-i-k3u1fbpfcp/{name}")
}

pub fn apply_reply(name: &str) -> Reply {
    Reply::Json(
        200,
        format!(
            r#"{{"ResponseMetadata":{{"RequestId":"1","Action":"ApplyImageUpload"}},"Result":{{"UploadAddress":{{"StoreInfos":[{{"StoreUri":"{}","Auth":"SpaceKey/k3u1fbpfcp/{name}"}}],"UploadHosts":["tos-d-x-lf.snssdk.com"],"SessionKey":"session-{name}"}}}}}}"#,
            store_uri(name)
        ),
    )
}

pub fn put_reply() -> Reply {
    Reply::Json(
        200,
        r#"{"success":0,"error":{"code":200,"message":"Success"},"payload":{"hash":"cbf43926"}}"#
            .to_string(),
    )
}

pub fn commit_reply() -> Reply {
    Reply::Json(
        200,
        r#"{"ResponseMetadata":{"RequestId":"2","Action":"CommitImageUpload"},"Result":{"Results":[]}}"#
            .to_string(),
    )
}

pub fn resolve_reply(url: &str) -> Reply {
    Reply::Json(
        200,
        format!(r#"{{"err_no":0,"err_msg":"success","data":{{"main_url":"{url}"}}}}"#),
    )
}

pub fn resolve_prefix(name: &str) -> String {
    format!("{RESOLVE_URL}?uri={}", store_uri(name).replace('/', "%2F"))
}

/// A mock serving one successful upload of `name` resolved to `url`.
pub fn uploading(name: &str, url: &str) -> MockHttpSend {
    MockHttpSend::new()
        .route(Method::GET, TOKEN_URL, token_reply())
        .route(Method::GET, APPLY_URL, apply_reply(name))
        .route(Method::POST, UPLOAD_URL, put_reply())
        .route(Method::POST, COMMIT_URL, commit_reply())
        .route(Method::GET, RESOLVE_URL, resolve_reply(url))
}

pub fn context(http: MockHttpSend) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();

    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(http)
}
