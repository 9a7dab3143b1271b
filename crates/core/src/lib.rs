//! sitepush-core - Core library for the sitepush deployer
//!
//! Scans a built site directory and uploads every file to an S3-compatible
//! bucket with per-object content-type and cache-control metadata.

pub mod client;
pub mod config;
pub mod deploy;
pub mod error;
pub mod metadata;
pub mod source;

// Re-export commonly used types
pub use client::{DryRunStore, ObjectStore, PutObject, S3Store};
pub use config::{
    config_template, find_config_file, get_config_path, load_config, load_config_file,
    resolve_config, save_config, validate_config,
};
pub use config::{CliOverrides, ConfigFile, DeployConfig, EnvOverrides, StorageConfig, StorageSection};
pub use deploy::{DeploySummary, Deployer, FailedUpload, FileOutcome, UploadStatus};
pub use error::{Error, Result};
pub use metadata::{content_type_for, CachePolicy};
pub use source::{object_key, SourceFile, SourceTree, UnreadableEntry};
