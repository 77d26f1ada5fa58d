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

use crate::constants::{query_escape, ALGORITHM, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN};
use crate::Credential;
use async_trait::async_trait;
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use mdimg_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use mdimg_core::time::{format_date, format_iso8601, now, DateTime};
use mdimg_core::{Context, Error, Result, SignRequest, SigningRequest};
use std::fmt::Write;

/// RequestSigner that implements the imagex flavour of AWS SigV4.
///
/// Differences from the S3 signer:
///
/// - the payload is always hashed, there is no `UNSIGNED-PAYLOAD`
/// - no `x-amz-content-sha256` header is sent
/// - the path is normalized but not re-encoded
/// - query values are escaped with `+` for spaces
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for the given service and region.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        body: Option<&[u8]>,
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::credential_invalid(
                "imagex requests must be signed with a credential",
            ));
        };

        let now = self.time.unwrap_or_else(now);
        let mut signed_req = SigningRequest::build(req)?;

        canonicalize_header(&mut signed_req, cred, now)?;

        // build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req, body)?;
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{ALGORITHM}")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{}", &scope)?;
            write!(f, "{}", &encoded_req)?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id,
            scope,
            signed_req.header_name_to_vec_sorted().join(";"),
            signature
        ))?;
        authorization.set_sensitive(true);

        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        // Apply to the request.
        signed_req.apply(req)
    }
}

/// Build the canonical request.
///
/// ```text
/// <method>
/// <normalized path>
/// <sorted, escaped query>
/// <name:value>\n for every header, sorted by name
///
/// <signed header names joined by ;>
/// <hex sha256 of payload>
/// ```
fn canonical_request_string(ctx: &SigningRequest, body: Option<&[u8]>) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{}", ctx.method)?;
    writeln!(f, "{}", ctx.path_normalized())?;
    writeln!(f, "{}", canonical_query_string(ctx))?;
    f.push_str(&canonical_header_string(ctx)?);
    writeln!(f)?;
    writeln!(f, "{}", ctx.header_name_to_vec_sorted().join(";"))?;
    // Absent body hashes as the empty payload.
    write!(f, "{}", hex_sha256(body.unwrap_or_default()))?;

    Ok(f)
}

fn canonical_query_string(ctx: &SigningRequest) -> String {
    let query = ctx
        .query
        .iter()
        .map(|(k, v)| (query_escape(k), query_escape(v)))
        .collect();

    SigningRequest::query_to_string(query, "=", "&")
}

fn canonical_header_string(ctx: &SigningRequest) -> Result<String> {
    let mut f = String::with_capacity(128);
    for name in ctx.header_name_to_vec_sorted() {
        writeln!(f, "{}:{}", name, ctx.header_value_joined(name)?)?;
    }
    Ok(f)
}

fn canonicalize_header(ctx: &mut SigningRequest, cred: &Credential, now: DateTime) -> Result<()> {
    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        let host = HeaderValue::from_str(ctx.authority.as_str())?;
        ctx.headers.insert(header::HOST, host);
    }

    ctx.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);

    let mut token = HeaderValue::from_str(&cred.session_token)?;
    // Set token value sensitive to avoid leaking.
    token.set_sensitive(true);
    ctx.headers.insert(X_AMZ_SECURITY_TOKEN, token);

    Ok(())
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
