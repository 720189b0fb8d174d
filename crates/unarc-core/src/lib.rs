//! Recursive archive extraction orchestration.
//!
//! `unarc-core` extracts archives (tar, compressed tar, zip, 7z, and
//! single-stream gz/bz2/xz/zst files) for a calling application, with
//! format detection by suffix and binary signature, path-traversal
//! protection on every entry, thread-safe progress reporting, and a
//! bounded job queue that performs recursive extraction: find archives,
//! extract them, extract the archives that were inside them, then
//! relocate the output and clean up.
//!
//! # Examples
//!
//! One-shot extraction of a single archive:
//!
//! ```no_run
//! use std::path::PathBuf;
//! use unarc_core::ExtractionRequest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ExtractionRequest {
//!     source: PathBuf::from("bundle.tar.gz"),
//!     output_dir: PathBuf::from("/output/dir"),
//!     ..ExtractionRequest::default()
//! };
//! let extraction = unarc_core::extract_file(&request)?;
//! println!("wrote {} files, {} bytes", extraction.files.len(), extraction.size);
//! # Ok(())
//! # }
//! ```
//!
//! Recursive, queued extraction of everything under a directory:
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use unarc_core::{Job, Notifier, Queue};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Queue::new();
//! queue.start(2, 16)?;
//! queue.submit(Job {
//!     root: PathBuf::from("/data/incoming"),
//!     notifier: Some(Notifier::Callback(Arc::new(|response| {
//!         if response.done {
//!             println!("done: {} bytes", response.size);
//!         }
//!     }))),
//!     ..Job::default()
//! })?;
//! queue.stop()?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod discover;
pub mod error;
pub mod formats;
pub mod progress;
pub mod queue;
pub mod request;
pub mod security;

mod processor;

// Re-export main API types
pub use api::extract_as;
pub use api::extract_file;
pub use discover::ArchiveList;
pub use discover::Filter;
pub use discover::find_compressed_files;
pub use error::ExtractError;
pub use error::JobFailure;
pub use error::Result;
pub use formats::ArchiveType;
pub use progress::Progress;
pub use progress::ProgressSink;
pub use queue::Job;
pub use queue::Notifier;
pub use queue::Queue;
pub use queue::Response;
pub use request::Extraction;
pub use request::ExtractionRequest;
