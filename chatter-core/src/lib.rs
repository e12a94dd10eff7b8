//! Markov text generation over an incrementally synced corpus cache.
//!
//! This crate provides:
//! - A fixed-order, token-level Markov chain
//! - A per-corpus snippet cache that deduplicates by key, persists to
//!   JSON, and keeps its chain in sync with a remote source
//! - A process context owning every corpus and the shared source handle
//!
//! The remote client itself lives outside this crate, behind the
//! [`corpus::source::SnippetSource`] trait.

/// Transition model and its context window.
pub mod model;

/// Snippets, fetch sources, and the corpus cache.
pub mod corpus;

/// Process-wide context (source handle + corpora by name).
pub mod context;

/// Settings loaded from JSON.
pub mod config;

/// Error types.
pub mod error;

/// I/O utilities (JSON persistence, path helpers).
pub mod io;

pub use config::{ChainConfig, CorpusConfig, Settings};
pub use context::Context;
pub use corpus::cache::{Bootstrap, CorpusCache, SnippetMap};
pub use corpus::snippet::{Punctuation, Snippet, SnippetPage};
pub use corpus::source::{MemorySource, Pages, SnippetSource, spawn_pages};
pub use error::{CorpusError, FetchError};
pub use model::chain::TransitionModel;
