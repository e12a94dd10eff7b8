//! Snippet collection side of a corpus: cleaning, fetching, and the
//! deduplicated, persisted cache feeding the chain.

/// Deduplicated snippet map paired with its chain.
///
/// Bootstraps from disk or from the source, runs sync rounds,
/// and rewrites the persisted image after each change.
pub mod cache;

/// Snippet types and punctuation cleaning.
pub mod snippet;

/// Fetch-source interface, threaded page producer, and in-memory source.
pub mod source;
