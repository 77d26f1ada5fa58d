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

use http::Uri;
use mdimg_core::{Error, Result};

/// Append query pairs to an endpoint.
///
/// Pairs are form encoded and joined to any query the endpoint already has.
pub fn endpoint_with_query(endpoint: &str, pairs: &[(&str, &str)]) -> Result<Uri> {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    let url = match (endpoint.contains('?'), query.is_empty()) {
        (_, true) => endpoint.to_string(),
        (true, false) => format!("{endpoint}&{query}"),
        (false, false) => format!("{endpoint}?{query}"),
    };

    url.parse::<Uri>().map_err(|e| {
        Error::config_invalid(format!("invalid endpoint: {endpoint}")).with_source(e)
    })
}

/// Parse a json body, keeping the raw body in the error.
pub fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::protocol(format!("unexpected response: {body}")).with_source(e))
}
