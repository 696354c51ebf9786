//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - The [`BlobStore`] abstraction used by the pipeline
//! - Byte uploads returning public URLs
//! - Object downloads
//! - Bucket connectivity checks

pub mod client;
pub mod error;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use store::{join_public_url, BlobStore};
