//! Job execution for the media conversion server.
//!
//! This crate provides:
//! - [`JobRunner`]: drives a job through a [`mconv_media::Transcoder`] and
//!   optional [`mconv_storage::StorageUploader`] to exactly one outcome
//! - [`ProgressBroadcast`]: fan-out of progress to connected observers
//! - [`CleanupScheduler`]: deferred removal of job files
//! - [`OutputLayout`]: upload/output naming and public URLs

pub mod broadcast;
pub mod cleanup;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod runner;

pub use broadcast::{Observer, ProgressBroadcast};
pub use cleanup::{paths_to_clean, CleanupScheduler, DEFAULT_GRACE_PERIOD};
pub use layout::{OutputLayout, OUTPUTS_ROUTE};
pub use logging::JobLogger;
pub use runner::{JobRunner, STORAGE_NOT_CONFIGURED};
