//! Fetch-source interface consumed by the corpus cache.
//!
//! A source hands out a lazy, finite sequence of pages. The cache pulls pages
//! until the sequence ends, so a source may still be fetching page `N + 1`
//! while page `N` is folded into the chain.

use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use super::snippet::SnippetPage;
use crate::error::FetchError;

/// Lazy sequence of pages produced by one fetch call.
///
/// The iterator ends once the source has produced every page it is going to
/// produce, which may be fewer than requested.
pub type Pages<'a> = Box<dyn Iterator<Item = Result<SnippetPage, FetchError>> + Send + 'a>;

/// External source of snippets (the remote site, a fixture, ...).
pub trait SnippetSource {
	/// Requests up to `page_count` pages of the most recent snippets of
	/// `corpus` written by `owner`.
	fn fetch_snippets(&self, corpus: &str, owner: &str, page_count: usize) -> Pages<'_>;
}

impl<S: SnippetSource + ?Sized> SnippetSource for &S {
	fn fetch_snippets(&self, corpus: &str, owner: &str, page_count: usize) -> Pages<'_> {
		(**self).fetch_snippets(corpus, owner, page_count)
	}
}

impl<S: SnippetSource + ?Sized> SnippetSource for Box<S> {
	fn fetch_snippets(&self, corpus: &str, owner: &str, page_count: usize) -> Pages<'_> {
		(**self).fetch_snippets(corpus, owner, page_count)
	}
}

/// Runs `fetch_page(0..page_count)` on a producer thread and returns the
/// receiving end as a [`Pages`] sequence.
///
/// # Behavior
/// - Pages are sent through a bounded channel in production order.
/// - A decode failure is forwarded and production continues.
/// - Any other failure is forwarded and ends production.
/// - The producer also stops once the consumer drops the sequence.
///
/// # Notes
/// - Uses MPSC channels so fetching overlaps with the consumer's work.
/// - Completion is signaled by the sender being dropped.
pub fn spawn_pages<F>(page_count: usize, mut fetch_page: F) -> Pages<'static>
where
	F: FnMut(usize) -> Result<SnippetPage, FetchError> + Send + 'static,
{
	let (tx, rx) = mpsc::sync_channel(page_count.max(1));

	thread::spawn(move || {
		for page in 0..page_count {
			let result = fetch_page(page);
			let fatal = matches!(&result, Err(e) if !e.is_decode());
			if tx.send(result).is_err() || fatal {
				break;
			}
		}
	});

	Box::new(rx.into_iter())
}

/// In-memory source serving scripted pages per corpus.
///
/// Every fetch replays the first `page_count` scripted entries, so the same
/// snippets come back on every call, the way the remote listing does between
/// two new posts.
#[derive(Debug, Default)]
pub struct MemorySource {
	corpora: HashMap<String, Vec<Result<SnippetPage, FetchError>>>,
	#[cfg(test)]
	requests: AtomicUsize,
}

impl MemorySource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a page to the script of `corpus`.
	pub fn push_page(&mut self, corpus: &str, page: SnippetPage) -> &mut Self {
		self.corpora.entry(corpus.to_owned()).or_default().push(Ok(page));
		self
	}

	/// Appends a failing page to the script of `corpus`.
	pub fn push_failure(&mut self, corpus: &str, error: FetchError) -> &mut Self {
		self.corpora.entry(corpus.to_owned()).or_default().push(Err(error));
		self
	}

	/// Drops the script of `corpus`.
	#[cfg(test)]
	pub(crate) fn clear(&mut self, corpus: &str) {
		self.corpora.remove(corpus);
	}

	/// Number of `fetch_snippets` calls served so far.
	#[cfg(test)]
	pub(crate) fn requests(&self) -> usize {
		self.requests.load(Ordering::Relaxed)
	}
}

impl SnippetSource for MemorySource {
	fn fetch_snippets(&self, corpus: &str, _owner: &str, page_count: usize) -> Pages<'_> {
		#[cfg(test)]
		self.requests.fetch_add(1, Ordering::Relaxed);
		let pages = self.corpora.get(corpus).map(Vec::as_slice).unwrap_or_default();
		Box::new(pages.iter().take(page_count).cloned())
	}
}
