//! S3-compatible object storage for conversion outputs.
//!
//! This crate provides:
//! - The [`StorageUploader`] capability
//! - An `aws-sdk-s3` implementation for GCS interop, R2 and similar endpoints
//! - Object path and content type helpers

pub mod client;
pub mod config;
pub mod error;
pub mod paths;
pub mod uploader;

pub use client::{ObjectStoreClient, UPLOADED_AT_KEY};
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use paths::{content_type_for, object_path, MediaKind};
pub use uploader::StorageUploader;
