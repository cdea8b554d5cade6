//! # pdfmerger
//!
//! Session-scoped upload-and-merge orchestration around an external PDF
//! merge tool.
//!
//! Callers upload documents into an isolated session, trigger one merge of
//! the session's files in upload order, and fetch the merged artifact
//! exactly once. Working files are removed after every merge attempt.
//!
//! ## Architecture
//!
//! - [`validation`]: admission checks on uploaded filenames
//! - [`session`]: session ids, the session registry and cleanup
//! - [`store`]: per-session working directories and stored uploads
//! - [`merge`]: output naming and invocation of the merge tool
//! - [`artifact`]: merged output records and one-shot delivery
//! - [`service`]: [`MergeService`], tying everything together
//! - [`config`]: configuration loading and validation
//! - [`error`]: error types with exit codes
//! - [`output`]: terminal output for front ends
//!
//! ## Example
//!
//! ```no_run
//! use pdfmerger::{Config, MergeService, SessionId, Upload};
//!
//! # async fn example() -> pdfmerger::Result<()> {
//! let service = MergeService::new(&Config::default())?;
//! service.init().await?;
//!
//! let session = SessionId::generate();
//! for path in ["cover.pdf", "body.pdf"] {
//!     let upload = Upload::from_path(std::path::Path::new(path)).await?;
//!     service.admit(&session, upload).await?;
//! }
//!
//! let outcome = service.merge(&session).await?;
//! let artifact = service.deliver(&session).await?;
//! assert_eq!(artifact.filename, outcome.filename);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod service;
pub mod session;
pub mod store;
pub mod utils;
pub mod validation;

pub use artifact::{ArtifactState, MergedArtifact};
pub use config::{Config, MergeToolConfig};
pub use error::{MergerError, Result};
pub use merge::MergeOutcome;
pub use service::MergeService;
pub use session::{SessionId, StoredFile};
pub use store::Upload;

/// Current version of pdfmerger.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
