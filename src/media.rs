//! Announcement media: upload rules and the file store behind `/storage`.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use axum::body::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Form field the file arrives in.
    pub fn field(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["jpeg", "png", "jpg", "gif", "webp"],
            MediaKind::Video => &["mp4", "webm", "ogg", "mov"],
        }
    }

    pub fn max_kilobytes(self) -> usize {
        match self {
            MediaKind::Image => 5 * 1024,
            MediaKind::Video => 50 * 1024,
        }
    }

    /// Directory under the media root, relative.
    fn directory(self) -> &'static str {
        match self {
            MediaKind::Image => "announcements",
            MediaKind::Video => "announcements/videos",
        }
    }
}

/// One uploaded file as received.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Check type and size against the rules for `kind`.
    pub fn validate(&self, kind: MediaKind) -> Result<(), ValidationError> {
        let field = kind.field();
        let allowed = kind.extensions();
        let known = self
            .extension()
            .is_some_and(|ext| allowed.contains(&ext.as_str()));
        if !known {
            return Err(ValidationError::new(
                field,
                format!("The {} field must be a file of type: {}.", field, allowed.join(", ")),
            ));
        }
        if self.bytes.len() > kind.max_kilobytes() * 1024 {
            return Err(ValidationError::new(
                field,
                format!(
                    "The {} field must not be greater than {} kilobytes.",
                    field,
                    kind.max_kilobytes()
                ),
            ));
        }
        Ok(())
    }
}

/// Storage for announcement files. Paths are relative to the public media root.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist `upload` and return its relative path.
    async fn store(&self, kind: MediaKind, upload: &Upload) -> anyhow::Result<String>;

    /// Remove a stored file. Returns `false` when there was nothing to remove.
    async fn delete(&self, path: &str) -> anyhow::Result<bool>;
}

/// Files on local disk under the directory served at `/storage`.
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a stored relative path, refusing anything that leaves the root.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        (contained && !path.is_empty()).then(|| self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, kind: MediaKind, upload: &Upload) -> anyhow::Result<String> {
        let extension = upload.extension().unwrap_or_else(|| "bin".to_string());
        let relative = format!(
            "{}/{}.{}",
            kind.directory(),
            Uuid::new_v4().simple(),
            extension
        );
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(&target, &upload.bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))?;

        debug!("Stored {} ({} bytes)", relative, upload.bytes.len());
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> anyhow::Result<bool> {
        let Some(target) = self.resolve(path) else {
            warn!("Refusing to delete media outside the store: {}", path);
            return Ok(false);
        };
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("deleting {}", target.display())),
        }
    }
}

/// Delete files that are no longer referenced. Failures are logged, not returned.
pub async fn discard(store: &dyn MediaStore, paths: Vec<String>) {
    for path in paths {
        if let Err(e) = store.delete(&path).await {
            warn!("Failed to delete media {}: {:#}", path, e);
        }
    }
}
