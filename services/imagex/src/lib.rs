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

//! ImageX upload support for mdimg.
//!
//! This crate signs imagex control plane requests, exchanges a user session
//! for storage tokens and runs the apply, put and commit phases that host an
//! image, then resolves its public url.
//!
//! ## Example
//!
//! ```no_run
//! use mdimg_core::{Context, Result};
//! use mdimg_imagex::{Config, UploadPipeline};
//!
//! async fn upload(ctx: Context) -> Result<()> {
//!     let config = Config::default().from_env(&ctx);
//!     config.validate()?;
//!
//!     let pipeline = UploadPipeline::new(ctx, config);
//!     let report = pipeline
//!         .run(&["./a.png".to_string()], &["/docs/a.png".to_string()])
//!         .await?;
//!     for (original, replacement) in report.pairs() {
//!         println!("{original} -> {replacement}");
//!     }
//!     Ok(())
//! }
//! ```

mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::RequestSigner;

mod upload;
pub use upload::{ImageUploader, Phase, UploadSlot, UploadState};

mod resolve;
pub use resolve::UrlResolver;

mod pipeline;
pub use pipeline::{PipelineReport, UploadOutcome, UploadPipeline};

mod utils;
