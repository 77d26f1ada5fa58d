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

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Signing parameters used by imagex.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const SERVICE_NAME: &str = "imagex";
pub const REGION: &str = "cn-north-1";
pub const SERVICE_ID: &str = "k3u1fbpfcp";
pub const API_VERSION: &str = "2018-08-01";

// Actions of the imagex control plane.
pub const ACTION_APPLY_IMAGE_UPLOAD: &str = "ApplyImageUpload";
pub const ACTION_COMMIT_IMAGE_UPLOAD: &str = "CommitImageUpload";

// Endpoints.
pub const TOKEN_ENDPOINT: &str = "https://api.juejin.cn/imagex/gen_token";
pub const IMAGEX_ENDPOINT: &str = "https://imagex.bytedanceapi.com/";
pub const RESOLVE_ENDPOINT: &str = "https://api.juejin.cn/imagex/get_img_url";

// Headers used in imagex services.
pub const X_AMZ_DATE: &str = "x-amz-date";
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
pub const CONTENT_CRC32: &str = "content-crc32";
pub const OCTET_STREAM: &str = "application/octet-stream";

// Cookie carrying the user session on the token endpoint.
pub const SESSION_COOKIE: &str = "sessionid";

// Env values used in imagex services.
pub const MDIMG_SESSION_ID: &str = "MDIMG_SESSION_ID";
pub const MDIMG_IMAGEX_SERVICE_ID: &str = "MDIMG_IMAGEX_SERVICE_ID";
pub const MDIMG_IMAGEX_REGION: &str = "MDIMG_IMAGEX_REGION";
pub const MDIMG_TOKEN_ENDPOINT: &str = "MDIMG_TOKEN_ENDPOINT";
pub const MDIMG_IMAGEX_ENDPOINT: &str = "MDIMG_IMAGEX_ENDPOINT";
pub const MDIMG_RESOLVE_ENDPOINT: &str = "MDIMG_RESOLVE_ENDPOINT";

/// AsciiSet for query escaping in canonical requests.
///
/// - Escape every byte except the unreserved characters: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
/// - Space is written as `+`, see [`query_escape`].
pub static QUERY_ESCAPE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Escape a query key or value for the canonical query string.
pub fn query_escape(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, &QUERY_ESCAPE_SET)
        .to_string()
        .replace("%20", "+")
}
