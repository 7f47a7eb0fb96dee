//! Tubefetch Core Library
//!
//! Picks one encoded variant of a media item and downloads it with a
//! sequential, resumable, cancellable chunked transfer.

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod paths;
pub mod progress;
pub mod resolver;
pub mod selector;
pub mod source;
pub mod transfer;
pub mod types;

// Re-export commonly used items at crate root
pub use catalog::StreamCatalog;
pub use config::{FetchConfig, NetworkConfig, default_output_dir};
pub use error::{FailureReason, Result, TubefetchError};
pub use format::{describe_variant, format_bytes, format_duration, format_length};
pub use paths::{destination_path, file_name_for, sanitize_file_name};
pub use progress::{ChannelSink, NoProgress, ProgressSink, ProgressSnapshot, SinkClosed};
pub use resolver::{ManifestResolver, MetadataResolver, YtDlpResolver};
pub use selector::{SelectionPolicy, select};
pub use source::{Connector, FileConnector, HttpConnector, SourceError, SourceStream, StandardConnector};
pub use transfer::{TransferEngine, TransferState, TransferStatus};
pub use types::{MediaInfo, MediaKind, RawVariant, ResolvedMedia, Resolution, SourceLocator, StreamVariant};

pub use tokio_util::sync::CancellationToken;
