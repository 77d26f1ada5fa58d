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

//! Find local images in a markdown document and point them at hosted urls.

use log::{debug, info};
use mdimg_core::{Context, Error, Result};
use mdimg_imagex::{Config, PipelineReport, UploadPipeline};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Matches `![alt](target)`, the target is captured.
static IMAGE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[.*?\]\((.*?)\)").expect("image reference pattern must be valid")
});

/// Targets with more than this many `%` are percent-decoded before resolving.
const ENCODED_TARGET_THRESHOLD: usize = 5;

/// Find the local image references of a markdown document.
///
/// Returns the references as written and their absolute paths, index paired.
/// Remote (`http*`) and empty targets are skipped. A reference whose path
/// cannot be resolved gets an empty path.
pub fn extract_image_references(document_path: &str, source: &str) -> (Vec<String>, Vec<String>) {
    let base = Path::new(document_path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut originals = Vec::new();
    let mut paths = Vec::new();
    for cap in IMAGE_REFERENCE.captures_iter(source) {
        let target = &cap[1];
        if target.is_empty() || target.starts_with("http") {
            continue;
        }

        let path = resolve_image_path(&base, target).unwrap_or_else(|| {
            debug!("failed to resolve image path: {target}");
            String::new()
        });
        originals.push(target.to_string());
        paths.push(path);
    }

    (originals, paths)
}

fn resolve_image_path(base: &Path, target: &str) -> Option<String> {
    let target = if target.matches('%').count() > ENCODED_TARGET_THRESHOLD {
        let target = target.replace('+', " ");
        percent_decode_str(&target).decode_utf8().ok()?.into_owned()
    } else {
        target.to_string()
    };

    let base = if base.is_absolute() {
        base.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(base)
    };

    // Targets are always relative to the document, even with a leading `/`.
    let joined = base.join(target.trim_start_matches('/'));
    Some(clean_path(&joined).to_string_lossy().into_owned())
}

/// Collapse `.` and `..` without touching the filesystem.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            c => cleaned.push(c.as_os_str()),
        }
    }
    cleaned
}

/// Replace every occurrence of each original with its replacement, in index order.
///
/// Fails with `InvariantViolation` when the two lists differ in length.
pub fn rewrite_document(
    source: &str,
    originals: &[String],
    replacements: &[String],
) -> Result<String> {
    if originals.len() != replacements.len() {
        return Err(Error::invariant_violation(format!(
            "got {} image references but {} replacements",
            originals.len(),
            replacements.len()
        )));
    }

    let mut rewritten = source.to_string();
    for (original, replacement) in originals.iter().zip(replacements) {
        if original.is_empty() || original == replacement {
            continue;
        }
        rewritten = rewritten.replace(original.as_str(), replacement);
    }
    Ok(rewritten)
}

/// Upload the local images of the document at `path` and rewrite it.
///
/// The document is copied to `<path>x` before it's overwritten. A document
/// without local images is left untouched.
pub async fn process_document(ctx: &Context, config: Config, path: &str) -> Result<PipelineReport> {
    config.validate()?;

    let content = ctx.file_read(path).await?;
    let source = String::from_utf8(content).map_err(|e| {
        Error::file_access(format!("document {path} is not valid utf-8")).with_source(e)
    })?;

    let (originals, paths) = extract_image_references(path, &source);
    info!("found {} local images in {path}", originals.len());
    if originals.is_empty() {
        return Ok(PipelineReport::default());
    }

    let pipeline = UploadPipeline::new(ctx.clone(), config);
    let report = pipeline.run(&originals, &paths).await?;
    let rewritten = rewrite_document(&source, &originals, &report.replacements())?;

    let backup = format!("{path}x");
    write_file(&backup, &source).await?;
    write_file(path, &rewritten).await?;
    info!("rewrote {path}, backup: {backup}");

    Ok(report)
}

async fn write_file(path: &str, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| Error::file_access(format!("failed to write file {path}")).with_source(e))
}
