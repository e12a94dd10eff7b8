use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`SnippetSource`](crate::corpus::source::SnippetSource)
/// while producing one page.
///
/// Only [`FetchError::Decode`] is recoverable inside a sync round: the page is
/// skipped and the remaining pages are still consumed. Every other variant
/// aborts the round and reaches the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
	#[error("request for page {page} failed: {reason}")]
	Transport { page: usize, reason: String },
	#[error("page {page} returned status {status}")]
	Status { page: usize, status: u16 },
	#[error("page {page} could not be decoded: {reason}")]
	Decode { page: usize, reason: String },
}

impl FetchError {
	/// Whether the failure is limited to the payload of a single page.
	pub fn is_decode(&self) -> bool {
		matches!(self, FetchError::Decode { .. })
	}
}

/// Error type for model construction, corpus sync, and persistence.
#[derive(Debug, Error)]
pub enum CorpusError {
	#[error("chain order must be >= 1, got {0}")]
	InvalidOrder(usize),
	#[error("chain order mismatch: expected {expected}, found {found}")]
	OrderMismatch { expected: usize, found: usize },
	#[error(transparent)]
	Fetch(#[from] FetchError),
	#[error("failed to read {}: {source}", .path.display())]
	Read { path: PathBuf, source: io::Error },
	#[error("{} is malformed: {source}", .path.display())]
	Malformed {
		path: PathBuf,
		source: serde_json::Error,
	},
	#[error("failed to write {}: {source}", .path.display())]
	Write { path: PathBuf, source: io::Error },
	#[error("unknown corpus '{0}'")]
	UnknownCorpus(String),
	#[error("configuration error: {0}")]
	Config(String),
}
