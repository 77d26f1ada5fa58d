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

use mdimg_core::utils::Redact;
use mdimg_core::SigningCredential;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// Temporary storage credential issued by the token endpoint.
///
/// It's fetched once per document and dropped with it. The expiry is
/// decided by the issuer and not tracked here.
#[derive(Default, Clone, Deserialize)]
pub struct Credential {
    /// Access key id for imagex.
    #[serde(rename = "AccessKeyID")]
    pub access_key_id: String,
    /// Secret access key for imagex.
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    /// Session token sent as `x-amz-security-token`.
    #[serde(rename = "SessionToken")]
    pub session_token: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}
