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

use crate::constants::{
    ACTION_APPLY_IMAGE_UPLOAD, ACTION_COMMIT_IMAGE_UPLOAD, API_VERSION, CONTENT_CRC32,
    OCTET_STREAM,
};
use crate::utils::{endpoint_with_query, parse_json};
use crate::{Config, Credential};
use bytes::Bytes;
use http::{header, Method, StatusCode};
use log::{debug, info};
use mdimg_core::hash::hex_crc32;
use mdimg_core::utils::Redact;
use mdimg_core::{Error, Result, Signer};
use serde::Deserialize;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Phase of a single image upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ask the control plane for an upload slot.
    Apply,
    /// Send the image bytes to the slot.
    Put,
    /// Finalize the uploaded object.
    Commit,
    /// Turn the store uri into a public url.
    Resolve,
}

impl Phase {
    /// Name used to tag errors of this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Apply => "apply",
            Phase::Put => "put",
            Phase::Commit => "commit",
            Phase::Resolve => "resolve",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination allocated by the apply phase, valid for one image.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadSlot {
    /// Object key in the store, also used to resolve the public url.
    pub store_uri: String,
    /// Token sent as `authorization` on the put request.
    pub store_auth: String,
    /// Host receiving the image bytes.
    pub upload_host: String,
    /// Opaque key finalizing the upload on commit.
    pub session_key: String,
}

impl UploadSlot {
    /// Url the image bytes are posted to.
    pub fn upload_url(&self) -> String {
        format!("https://{}/{}", self.upload_host, self.store_uri)
    }
}

impl Debug for UploadSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSlot")
            .field("store_uri", &self.store_uri)
            .field("store_auth", &Redact::from(&self.store_auth))
            .field("upload_host", &self.upload_host)
            .field("session_key", &Redact::from(&self.session_key))
            .finish()
    }
}

/// State of a single image upload.
///
/// ```text
/// Idle --apply--> Applied --put--> Uploaded --commit--> Committed
///   \               \                \
///    +---------------+----------------+--> Failed
/// ```
#[derive(Debug)]
pub enum UploadState {
    /// Nothing happened yet.
    Idle,
    /// A slot has been allocated.
    Applied(UploadSlot),
    /// The image bytes have been accepted by the upload host.
    Uploaded(UploadSlot),
    /// The object is finalized.
    Committed(UploadSlot),
    /// A phase failed, the error is tagged with the phase name.
    Failed(Error),
}

impl UploadState {
    /// Committed and Failed have no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Committed(_) | UploadState::Failed(_))
    }
}

/// ImageUploader drives the apply, put and commit phases for one image at a time.
///
/// Apply and commit are signed with the storage token held by the signer.
/// Put is authorized by the slot's own token. No phase is retried and an
/// allocated slot is never reused.
#[derive(Debug, Clone)]
pub struct ImageUploader {
    signer: Signer<Credential>,
    config: Arc<Config>,
}

impl ImageUploader {
    /// Create a new uploader.
    pub fn new(signer: Signer<Credential>, config: Arc<Config>) -> Self {
        Self { signer, config }
    }

    /// Upload an image, running every phase until the upload is committed or failed.
    pub async fn upload(&self, content: Bytes) -> Result<UploadSlot> {
        let mut state = UploadState::Idle;
        while !state.is_terminal() {
            state = self.advance(state, &content).await;
        }

        match state {
            UploadState::Committed(slot) => Ok(slot),
            UploadState::Failed(err) => Err(err),
            state => Err(Error::unexpected(format!(
                "upload stopped in non terminal state: {state:?}"
            ))),
        }
    }

    /// Run the next phase for `state`.
    ///
    /// Terminal states are returned unchanged.
    pub async fn advance(&self, state: UploadState, content: &Bytes) -> UploadState {
        match state {
            UploadState::Idle => match self.apply().await {
                Ok(slot) => UploadState::Applied(slot),
                Err(err) => UploadState::Failed(err.with_operation(Phase::Apply.as_str())),
            },
            UploadState::Applied(slot) => match self.put(&slot, content.clone()).await {
                Ok(()) => UploadState::Uploaded(slot),
                Err(err) => UploadState::Failed(err.with_operation(Phase::Put.as_str())),
            },
            UploadState::Uploaded(slot) => match self.commit(&slot).await {
                Ok(()) => UploadState::Committed(slot),
                Err(err) => UploadState::Failed(err.with_operation(Phase::Commit.as_str())),
            },
            state => state,
        }
    }

    /// Allocate an upload slot.
    ///
    /// The first store info and the first upload host are selected.
    pub async fn apply(&self) -> Result<UploadSlot> {
        let uri = endpoint_with_query(
            &self.config.api_endpoint,
            &[
                ("Action", ACTION_APPLY_IMAGE_UPLOAD),
                ("Version", API_VERSION),
                ("ServiceId", &self.config.service_id),
            ],
        )?;

        let body = self.send_signed(Method::GET, uri).await?;
        let resp: ApplyResponse = parse_json(&body)?;
        if let Some(err) = resp.response_metadata.error {
            return Err(Error::protocol(format!(
                "apply image upload failed: {err}, body={body}"
            )));
        }

        let address = resp
            .result
            .map(|v| v.upload_address)
            .ok_or_else(|| Error::protocol(format!("upload address is missing: {body}")))?;
        let store = address
            .store_infos
            .into_iter()
            .next()
            .ok_or_else(|| Error::protocol("apply returned no store info"))?;
        let upload_host = address
            .upload_hosts
            .into_iter()
            .next()
            .ok_or_else(|| Error::protocol("apply returned no upload host"))?;

        let slot = UploadSlot {
            store_uri: store.store_uri,
            store_auth: store.auth,
            upload_host,
            session_key: address.session_key,
        };
        debug!("got upload slot: {slot:?}");
        Ok(slot)
    }

    /// Post the image bytes to the slot.
    pub async fn put(&self, slot: &UploadSlot, content: Bytes) -> Result<()> {
        let checksum = hex_crc32(&content);
        info!("uploading to {}", slot.store_uri);

        let mut auth = http::HeaderValue::from_str(&slot.store_auth)?;
        auth.set_sensitive(true);

        let req = http::Request::builder()
            .method(Method::POST)
            .uri(slot.upload_url())
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, OCTET_STREAM)
            .header(CONTENT_CRC32, checksum)
            .body(content)
            .map_err(|e| Error::request_invalid("failed to build put request").with_source(e))?;

        let resp = self.signer.context().http_send_as_string(req).await?;
        let put: PutResponse = parse_json(resp.body())?;
        if put.success != 0 {
            return Err(Error::protocol(format!(
                "upload host rejected the image: status={}, body={}",
                resp.status(),
                resp.body()
            )));
        }

        info!("uploaded {}, hash: {}", slot.store_uri, put.payload.hash);
        Ok(())
    }

    /// Finalize the object uploaded to the slot.
    pub async fn commit(&self, slot: &UploadSlot) -> Result<()> {
        let uri = endpoint_with_query(
            &self.config.api_endpoint,
            &[
                ("Action", ACTION_COMMIT_IMAGE_UPLOAD),
                ("Version", API_VERSION),
                ("SessionKey", &slot.session_key),
                ("ServiceId", &self.config.service_id),
            ],
        )?;

        let body = self.send_signed(Method::POST, uri).await?;
        let resp: CommitResponse = parse_json(&body)?;
        if let Some(err) = resp.response_metadata.error {
            return Err(Error::protocol(format!(
                "commit image upload failed: {err}, body={body}"
            )));
        }

        debug!("committed upload of {}", slot.store_uri);
        Ok(())
    }

    /// Sign and send a control plane request with an empty body.
    async fn send_signed(&self, method: Method, uri: http::Uri) -> Result<String> {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .map_err(|e| Error::request_invalid("failed to build signed request").with_source(e))?;

        let (mut parts, body) = req.into_parts();
        self.signer.sign(&mut parts, Some(&body)).await?;
        let req = http::Request::from_parts(parts, body);

        let resp = self.signer.context().http_send_as_string(req).await?;
        if resp.status() != StatusCode::OK {
            return Err(Error::transport(format!(
                "request to imagex failed: status={}, body={}",
                resp.status(),
                resp.body()
            )));
        }

        Ok(resp.into_body())
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ResponseMetadata {
    /// Any `Error` key marks the call as failed, even `"Error": null`.
    #[serde(deserialize_with = "deserialize_present")]
    error: Option<serde_json::Value>,
}

fn deserialize_present<'de, D>(d: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(d).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyResponse {
    #[serde(default)]
    response_metadata: ResponseMetadata,
    result: Option<ApplyResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyResult {
    upload_address: UploadAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UploadAddress {
    #[serde(default)]
    store_infos: Vec<StoreInfo>,
    #[serde(default)]
    upload_hosts: Vec<String>,
    #[serde(default)]
    session_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StoreInfo {
    store_uri: String,
    #[serde(default)]
    auth: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommitResponse {
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PutResponse {
    success: i64,
    payload: PutPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PutPayload {
    hash: String,
}
