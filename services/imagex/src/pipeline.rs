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

use crate::constants::SERVICE_NAME;
use crate::{
    Config, Credential, ImageUploader, RequestSigner, SessionCredentialProvider, UrlResolver,
};
use bytes::Bytes;
use log::{debug, info, warn};
use mdimg_core::{Context, Error, ErrorKind, ProvideCredential, Result, Signer};
use std::sync::Arc;

/// Result of one image's trip through the pipeline.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Reference as written in the document.
    pub original: String,
    /// Public url on success.
    pub url: Option<String>,
    /// Failure detail, tagged with the phase when one is known.
    pub error: Option<Error>,
}

impl UploadOutcome {
    fn succeeded(original: &str, url: String) -> Self {
        Self {
            original: original.to_string(),
            url: Some(url),
            error: None,
        }
    }

    fn failed(original: &str, err: Error) -> Self {
        Self {
            original: original.to_string(),
            url: None,
            error: Some(err),
        }
    }

    /// Check if the image was uploaded and resolved.
    pub fn is_success(&self) -> bool {
        self.url.is_some()
    }

    /// The string to substitute for the original reference.
    ///
    /// Failed images keep their original reference.
    pub fn replacement(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.original)
    }
}

/// Outcomes of a pipeline run, index paired with the input references.
#[derive(Debug, Default)]
pub struct PipelineReport {
    outcomes: Vec<UploadOutcome>,
    failed: usize,
}

impl PipelineReport {
    /// Per image outcomes in input order.
    pub fn outcomes(&self) -> &[UploadOutcome] {
        &self.outcomes
    }

    /// Number of images that kept their original reference.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Replacement strings in input order.
    pub fn replacements(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|v| v.replacement().to_string())
            .collect()
    }

    /// `(original, replacement)` pairs in input order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.outcomes
            .iter()
            .map(|v| (v.original.as_str(), v.replacement()))
    }
}

/// UploadPipeline uploads every image of a document, one after another.
///
/// A failed image never stops the run: its original reference is kept and
/// the failure is counted. The storage token is fetched on the first upload
/// of a run and reused for the rest of it.
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    ctx: Context,
    config: Arc<Config>,
    signer: Signer<Credential>,
}

impl UploadPipeline {
    /// Create a pipeline exchanging the configured session id for storage tokens.
    pub fn new(ctx: Context, config: Config) -> Self {
        let config = Arc::new(config);
        let signer = Signer::new(
            ctx.clone(),
            SessionCredentialProvider::new(config.clone()),
            RequestSigner::new(SERVICE_NAME, &config.region),
        );

        Self {
            ctx,
            config,
            signer,
        }
    }

    /// Replace the storage token provider.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.signer = self.signer.with_credential_provider(provider);
        self
    }

    /// Get the config used by this pipeline.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Upload the images at `paths`, index paired with `originals`.
    ///
    /// An empty path marks a reference whose path could not be resolved; it
    /// fails without any network call. Returns `InvariantViolation` when the
    /// two lists differ in length.
    pub async fn run(&self, originals: &[String], paths: &[String]) -> Result<PipelineReport> {
        if originals.len() != paths.len() {
            return Err(Error::invariant_violation(format!(
                "got {} image references but {} paths",
                originals.len(),
                paths.len()
            )));
        }

        let mut run = PipelineRun::new(self);
        let mut report = PipelineReport::default();
        let total = paths.len();

        for (idx, (original, path)) in originals.iter().zip(paths).enumerate() {
            info!("uploading {}/{}: {}", idx + 1, total, path);

            let outcome = match run.upload(path).await {
                Ok(url) => UploadOutcome::succeeded(original, url),
                Err(err) => {
                    warn!("failed to upload {original}: {err}");
                    report.failed += 1;
                    UploadOutcome::failed(original, err)
                }
            };
            report.outcomes.push(outcome);
        }

        if report.outcomes.len() != originals.len() {
            return Err(Error::invariant_violation(format!(
                "produced {} outcomes for {} image references",
                report.outcomes.len(),
                originals.len()
            )));
        }
        if report.failed > 0 {
            warn!("{} of {} images failed to upload", report.failed, total);
        }

        Ok(report)
    }
}

/// State shared by the images of a single run.
struct PipelineRun {
    ctx: Context,
    signer: Signer<Credential>,
    uploader: ImageUploader,
    resolver: UrlResolver,
    /// Message of a rejected token exchange, replayed for later images.
    denied: Option<String>,
}

impl PipelineRun {
    fn new(pipeline: &UploadPipeline) -> Self {
        let signer = pipeline.signer.fork();

        Self {
            ctx: pipeline.ctx.clone(),
            uploader: ImageUploader::new(signer.clone(), pipeline.config.clone()),
            resolver: UrlResolver::new(pipeline.ctx.clone(), pipeline.config.clone()),
            signer,
            denied: None,
        }
    }

    async fn upload(&mut self, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(Error::file_access("image path could not be resolved"));
        }
        let content = self.ctx.file_read(path).await?;

        if let Some(msg) = &self.denied {
            return Err(Error::credential_denied(msg.clone()));
        }
        let cred = self.signer.credential().await.inspect_err(|err| {
            if err.kind() == ErrorKind::CredentialDenied {
                self.denied = Some(err.message().to_string());
            }
        })?;
        debug!("uploading with token: {cred:?}");

        let slot = self.uploader.upload(Bytes::from(content)).await?;
        self.resolver.resolve(&slot.store_uri).await
    }
}
