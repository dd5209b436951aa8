//! Multipart intake: stores uploaded files and collects text fields.

use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use mconv_models::FormFields;
use mconv_worker::{CleanupScheduler, OutputLayout};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// An uploaded file stored under the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub original_name: Option<String>,
}

/// A parsed multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, StoredFile>,
    pub fields: FormFields,
}

impl UploadForm {
    /// Read the whole request. Parts named in `file_fields` are streamed to
    /// disk; every other part is read as text.
    ///
    /// If reading fails midway, files already stored are removed before the
    /// error is returned.
    pub async fn read(
        mut multipart: Multipart,
        layout: &OutputLayout,
        file_fields: &[&str],
        cleanup: &CleanupScheduler,
    ) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        loop {
            let next = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    form.discard(cleanup).await;
                    return Err(ApiError::from_multipart(e));
                }
            };

            let Some(name) = next.name().map(str::to_string) else {
                continue;
            };

            let is_file = file_fields.contains(&name.as_str());
            let result = if is_file && !form.files.contains_key(&name) {
                let stored = store_file(next, &name, layout).await;
                match stored {
                    Ok(Some(stored)) => {
                        form.files.insert(name, stored);
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                    Err(e) => Err(e),
                }
            } else if is_file {
                // Duplicate file part; drain it without storing
                drain(next).await
            } else {
                match next.text().await {
                    Ok(value) => {
                        form.fields.insert(name, value);
                        Ok(())
                    }
                    Err(e) => Err(ApiError::from_multipart(e)),
                }
            };

            if let Err(e) = result {
                form.discard(cleanup).await;
                return Err(e);
            }
        }

        Ok(form)
    }

    /// Take ownership of a stored file.
    pub fn take_file(&mut self, name: &str) -> Option<StoredFile> {
        self.files.remove(name)
    }

    /// Hand a file back, e.g. when the job it was taken for was never built.
    pub fn restore(&mut self, name: &str, file: StoredFile) {
        self.files.insert(name.to_string(), file);
    }

    /// Paths of files still held by the form.
    pub fn stored_paths(&self) -> Vec<PathBuf> {
        self.files.values().map(|f| f.path.clone()).collect()
    }

    /// Remove every file still held by the form.
    pub async fn discard(&mut self, cleanup: &CleanupScheduler) {
        let paths = self.stored_paths();
        self.files.clear();
        if !paths.is_empty() {
            cleanup.remove_now(&paths).await;
        }
    }
}

async fn store_file(
    mut field: Field<'_>,
    name: &str,
    layout: &OutputLayout,
) -> ApiResult<Option<StoredFile>> {
    let original_name = field
        .file_name()
        .map(str::to_string)
        .filter(|n| !n.is_empty());
    let path = layout.upload_path(name, original_name.as_deref());

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
    let mut size = 0u64;

    let written: ApiResult<()> = async {
        while let Some(chunk) = field.chunk().await.map_err(ApiError::from_multipart)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;
            size += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))
    }
    .await;
    drop(file);

    // Browsers send an empty part when no file was chosen
    if written.is_err() || (size == 0 && original_name.is_none()) {
        let _ = tokio::fs::remove_file(&path).await;
        return written.map(|_| None);
    }

    debug!(field = name, path = %path.display(), size, "Stored upload");
    Ok(Some(StoredFile {
        path,
        original_name,
    }))
}

async fn drain(mut field: Field<'_>) -> ApiResult<()> {
    while field
        .chunk()
        .await
        .map_err(ApiError::from_multipart)?
        .is_some()
    {}
    Ok(())
}
