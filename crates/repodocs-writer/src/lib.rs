//! Path derivation and idempotent document writing (component H, spec
//! §4.H).

use repodocs_types::{Document, DocumentMetadata, RepodocsError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Construction-time configuration for a [`Writer`].
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub output_dir: PathBuf,
    /// Single file per source in the output root instead of nested
    /// directories mirroring the URL path.
    pub flat: bool,
    /// Write a `.json` metadata sidecar alongside the Markdown body.
    pub write_sidecar: bool,
    /// Compute the path and log the action, but never touch disk.
    pub dry_run: bool,
    /// Overwrite even when the on-disk content hash already matches.
    pub force_overwrite: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            flat: false,
            write_sidecar: true,
            dry_run: false,
            force_overwrite: false,
        }
    }
}

pub struct Writer {
    options: WriterOptions,
}

impl Writer {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    /// Writes `document`'s body (and optional sidecar) to disk, returning
    /// the path written, relative to the output directory, for the State
    /// Store to record.
    pub async fn write(&self, document: &Document) -> Result<String> {
        let relative = derive_path(&document.source_url, self.options.flat);
        let absolute = self.options.output_dir.join(&relative);

        if self.options.dry_run {
            info!(path = %relative.display(), "dry-run: would write document");
            return Ok(relative.to_string_lossy().into_owned());
        }

        if !self.options.force_overwrite && unchanged_on_disk(&absolute, &document.content_hash).await {
            debug!(path = %relative.display(), "content hash unchanged, skipping write");
            return Ok(relative.to_string_lossy().into_owned());
        }

        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepodocsError::Write(format!("create_dir_all {}: {e}", parent.display())))?;
        }

        tokio::fs::write(&absolute, &document.body)
            .await
            .map_err(|e| RepodocsError::Write(format!("write {}: {e}", absolute.display())))?;

        if self.options.write_sidecar {
            let sidecar_path = absolute.with_extension("json");
            let metadata = DocumentMetadata::from(document);
            let json = serde_json::to_vec_pretty(&metadata)
                .map_err(|e| RepodocsError::Write(format!("serialize sidecar: {e}")))?;
            tokio::fs::write(&sidecar_path, json)
                .await
                .map_err(|e| RepodocsError::Write(format!("write {}: {e}", sidecar_path.display())))?;
        }

        Ok(relative.to_string_lossy().into_owned())
    }
}

async fn unchanged_on_disk(path: &Path, content_hash: &str) -> bool {
    let Ok(existing) = tokio::fs::read(path).await else {
        return false;
    };
    let existing_hash = hex::encode(Sha256::digest(&existing));
    existing_hash == content_hash
}

/// Derives a stable, filesystem-safe relative path from a document's
/// source URL.
pub fn derive_path(source_url: &str, flat: bool) -> PathBuf {
    let Ok(url) = Url::parse(source_url) else {
        return PathBuf::from(sanitize_segment(source_url)).with_extension("md");
    };

    let host = url.host_str().unwrap_or("unknown-host");
    let mut segments: Vec<String> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(sanitize_segment).collect())
        .unwrap_or_default();

    if segments.is_empty() {
        segments.push("index".to_string());
    }

    if flat {
        let mut filename = sanitize_segment(host);
        filename.push('_');
        filename.push_str(&segments.join("_"));
        PathBuf::from(with_md_extension(&filename))
    } else {
        let mut path = PathBuf::from(sanitize_segment(host));
        for segment in &segments[..segments.len() - 1] {
            path.push(segment);
        }
        path.push(with_md_extension(segments.last().unwrap()));
        path
    }
}

fn with_md_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => format!("{stem}.md"),
        _ => format!("{name}.md"),
    }
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn doc(url: &str, body: &str) -> Document {
        Document {
            source_url: url.to_string(),
            title: "T".to_string(),
            description: "D".to_string(),
            body: body.to_string(),
            content_hash: hex::encode(Sha256::digest(body.as_bytes())),
            fetched_at: Utc::now(),
            headings: BTreeMap::new(),
            links: Vec::new(),
            word_count: 1,
            char_count: 1,
            rendered_with_js: false,
            strategy: "single".to_string(),
            cache_hit: false,
        }
    }

    #[test]
    fn nested_path_mirrors_url_segments() {
        let path = derive_path("https://example.com/guide/intro", false);
        assert_eq!(path, PathBuf::from("example.com/guide/intro.md"));
    }

    #[test]
    fn root_path_becomes_index() {
        let path = derive_path("https://example.com/", false);
        assert_eq!(path, PathBuf::from("example.com/index.md"));
    }

    #[test]
    fn flat_mode_is_a_single_file() {
        let path = derive_path("https://example.com/guide/intro", true);
        assert_eq!(path, PathBuf::from("example.com_guide_intro.md"));
    }

    #[tokio::test]
    async fn write_creates_file_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(WriterOptions {
            output_dir: dir.path().to_path_buf(),
            ..WriterOptions::default()
        });
        let document = doc("https://example.com/page", "# Hello\n");
        let relative = writer.write(&document).await.unwrap();

        let written = tokio::fs::read_to_string(dir.path().join(&relative)).await.unwrap();
        assert_eq!(written, "# Hello\n");

        let sidecar_path = dir.path().join(&relative).with_extension("json");
        assert!(sidecar_path.exists());
    }

    #[tokio::test]
    async fn dry_run_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(WriterOptions {
            output_dir: dir.path().to_path_buf(),
            dry_run: true,
            ..WriterOptions::default()
        });
        let document = doc("https://example.com/page", "# Hello\n");
        let relative = writer.write(&document).await.unwrap();
        assert!(!dir.path().join(&relative).exists());
    }

    #[tokio::test]
    async fn unchanged_content_hash_skips_write() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(WriterOptions {
            output_dir: dir.path().to_path_buf(),
            ..WriterOptions::default()
        });
        let document = doc("https://example.com/page", "# Hello\n");
        writer.write(&document).await.unwrap();

        let sidecar_path = dir
            .path()
            .join(derive_path(&document.source_url, false))
            .with_extension("json");
        let before = tokio::fs::metadata(&sidecar_path).await.unwrap().modified().unwrap();

        writer.write(&document).await.unwrap();
        let after = tokio::fs::metadata(&sidecar_path).await.unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn force_overwrite_rewrites_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(WriterOptions {
            output_dir: dir.path().to_path_buf(),
            force_overwrite: true,
            ..WriterOptions::default()
        });
        let document = doc("https://example.com/page", "# Hello\n");
        writer.write(&document).await.unwrap();
        writer.write(&document).await.unwrap();
        let relative = derive_path(&document.source_url, false);
        assert!(dir.path().join(relative).exists());
    }
}
