use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::snippet::Punctuation;
use super::source::{Pages, SnippetSource};
use crate::config::ChainConfig;
use crate::error::CorpusError;
use crate::io::{read_json, write_json};
use crate::model::chain::TransitionModel;

/// Snippet key -> cleaned content, in the order it is persisted.
pub type SnippetMap = BTreeMap<String, String>;

/// How a corpus was hydrated by [`CorpusCache::bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
	/// Read from the persisted image, without touching the source.
	Loaded { snippets: usize },
	/// Fetched from the source, then written out.
	Fetched { snippets: usize },
}

/// Deduplicated snippet store of one corpus, paired with its chain.
///
/// # Responsibilities
/// - Hydrate from the persisted image, or from the source on first run
/// - Merge new snippets from the source into the map and the chain
/// - Rewrite the persisted image whenever the map changed
///
/// # Invariants
/// - Every key of `snippets` has been learned by `model` exactly once
/// - `stale` is `true` iff the persisted image may lag behind `snippets`
///
/// Mutating operations take `&mut self`; one cache must not sync twice
/// concurrently and it owns its file exclusively.
#[derive(Debug)]
pub struct CorpusCache {
	name: String,
	owner: String,
	path: PathBuf,
	punctuation: Punctuation,
	model: TransitionModel,
	snippets: SnippetMap,
	stale: bool,
}

impl CorpusCache {
	/// Creates an empty cache persisted at `path`.
	///
	/// # Errors
	/// Returns [`CorpusError::InvalidOrder`] if `chain.order < 1`.
	pub fn new(
		name: impl Into<String>,
		owner: impl Into<String>,
		chain: &ChainConfig,
		path: impl Into<PathBuf>,
	) -> Result<Self, CorpusError> {
		Ok(Self {
			name: name.into(),
			owner: owner.into(),
			path: path.into(),
			punctuation: Punctuation::new(&chain.punctuation),
			model: TransitionModel::new(chain.order)?,
			snippets: SnippetMap::new(),
			stale: false,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn owner(&self) -> &str {
		&self.owner
	}

	/// Location of the persisted image.
	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn model(&self) -> &TransitionModel {
		&self.model
	}

	pub fn snippets(&self) -> &SnippetMap {
		&self.snippets
	}

	pub fn len(&self) -> usize {
		self.snippets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.snippets.is_empty()
	}

	pub fn contains(&self, key: &str) -> bool {
		self.snippets.contains_key(key)
	}

	/// Whether the persisted image may lag behind the in-memory map.
	pub fn is_stale(&self) -> bool {
		self.stale
	}

	/// Generates at most `n` tokens from the corpus chain.
	pub fn generate(&self, n: usize) -> String {
		self.model.generate(n)
	}

	/// Hydrates the cache, from disk if possible, otherwise from `source`.
	///
	/// # Behavior
	/// - Persisted image found: every stored snippet is replayed through the
	///   chain. The source is not contacted.
	/// - No image: `initial_pages` pages are fetched, cleaned, deduplicated,
	///   learned, and the full map is written out.
	///
	/// # Errors
	/// - [`CorpusError::Read`] / [`CorpusError::Malformed`] if an image exists
	///   but cannot be loaded
	/// - [`CorpusError::Fetch`] if the source fails (decode failures excepted)
	/// - [`CorpusError::Write`] if the fresh image cannot be written; the
	///   in-memory state stays usable
	pub fn bootstrap<S>(&mut self, source: &S, initial_pages: usize) -> Result<Bootstrap, CorpusError>
	where
		S: SnippetSource + ?Sized,
	{
		if let Some(stored) = read_json::<SnippetMap, _>(&self.path)? {
			info!("Corpus '{}': {} was found, reading...", self.name, self.path.display());

			let fresh: Vec<(String, String)> = stored
				.into_iter()
				.filter(|(key, _)| !self.snippets.contains_key(key))
				.collect();
			let texts: Vec<&str> = fresh.iter().map(|(_, content)| content.as_str()).collect();
			self.model.learn_all(&texts);

			let snippets = fresh.len();
			self.snippets.extend(fresh);
			info!("Corpus '{}': learned {} stored snippets", self.name, snippets);
			return Ok(Bootstrap::Loaded { snippets });
		}

		info!(
			"Corpus '{}': {} was not found, fetching {} pages...",
			self.name,
			self.path.display(),
			initial_pages
		);
		let pages = source.fetch_snippets(&self.name, &self.owner, initial_pages);
		let snippets = self.absorb(pages)?;
		self.persist()?;
		info!("Corpus '{}': stored {} snippets", self.name, snippets);
		Ok(Bootstrap::Fetched { snippets })
	}

	/// Runs one sync round against `source`.
	///
	/// Fetches `page_count` pages of the most recent snippets and folds every
	/// unknown key into the map and the chain. The image is rewritten when the
	/// round found something, or when an earlier write is still pending.
	///
	/// Returns `true` if at least one new snippet was found.
	///
	/// # Errors
	/// - [`CorpusError::Fetch`] on transport or status failures; snippets
	///   absorbed before the failure are kept and written on the next round
	/// - [`CorpusError::Write`] if the image cannot be written
	pub fn sync<S>(&mut self, source: &S, page_count: usize) -> Result<bool, CorpusError>
	where
		S: SnippetSource + ?Sized,
	{
		info!("Corpus '{}': gathering latest data...", self.name);
		let pages = source.fetch_snippets(&self.name, &self.owner, page_count);
		let added = self.absorb(pages)?;

		if added > 0 {
			info!("Corpus '{}': {} new snippets found, writing to file...", self.name, added);
		} else {
			info!("Corpus '{}': no new data found", self.name);
		}

		if self.stale {
			self.persist()?;
		}
		Ok(added > 0)
	}

	/// Consumes pages until the source signals completion.
	///
	/// Returns the number of snippets added.
	fn absorb(&mut self, pages: Pages<'_>) -> Result<usize, CorpusError> {
		let mut added = 0;

		for (index, page) in pages.enumerate() {
			let page = match page {
				Ok(page) => page,
				Err(e) if e.is_decode() => {
					warn!("Corpus '{}': skipping unreadable page: {}", self.name, e);
					continue;
				}
				Err(e) => return Err(e.into()),
			};
			debug!("Corpus '{}': page {} holds {} snippets", self.name, index, page.len());

			for snippet in page {
				let snippet = self.punctuation.clean_snippet(snippet);
				if let Entry::Vacant(entry) = self.snippets.entry(snippet.key) {
					self.model.learn(&snippet.content);
					entry.insert(snippet.content);
					self.stale = true;
					added += 1;
				}
			}
		}

		Ok(added)
	}

	/// Rewrites the whole persisted image.
	fn persist(&mut self) -> Result<(), CorpusError> {
		match write_json(&self.path, &self.snippets) {
			Ok(()) => {
				self.stale = false;
				Ok(())
			}
			Err(e) => {
				warn!("Corpus '{}': {}", self.name, e);
				self.stale = true;
				Err(e)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::snippet::Snippet;
	use crate::corpus::source::MemorySource;
	use std::fs;
	use tempfile::TempDir;

	fn cache_at(path: PathBuf) -> CorpusCache {
		CorpusCache::new("comments", "owner", &ChainConfig::default(), path).unwrap()
	}

	#[test]
	fn failed_write_is_retried_on_next_round() {
		let tmp = TempDir::new().unwrap();
		let blocker = tmp.path().join("blocker");
		fs::write(&blocker, "not a directory").unwrap();

		let mut source = MemorySource::new();
		source.push_page("comments", vec![Snippet::new("k1", "hello there")]);

		let mut cache = cache_at(blocker.join("comments.json"));
		assert!(matches!(cache.sync(&source, 2), Err(CorpusError::Write { .. })));
		assert!(cache.contains("k1"));
		assert!(cache.is_stale());
		assert_eq!(cache.generate(5), "hello there");

		fs::remove_file(&blocker).unwrap();
		assert!(!cache.sync(&source, 2).unwrap());
		assert!(!cache.is_stale());

		let stored: SnippetMap = read_json(cache.path()).unwrap().unwrap();
		assert_eq!(stored.len(), 1);
	}

	#[test]
	fn transport_failure_keeps_absorbed_snippets_pending() {
		let tmp = TempDir::new().unwrap();
		let mut source = MemorySource::new();
		source
			.push_page("comments", vec![Snippet::new("k1", "first")])
			.push_failure("comments", crate::error::FetchError::Status { page: 1, status: 503 });

		let mut cache = cache_at(tmp.path().join("comments.json"));
		assert!(matches!(cache.sync(&source, 2), Err(CorpusError::Fetch(_))));
		assert!(cache.contains("k1"));
		assert!(cache.is_stale());
		assert!(!cache.path().exists());

		source.clear("comments");
		assert!(!cache.sync(&source, 2).unwrap());
		let stored: SnippetMap = read_json(cache.path()).unwrap().unwrap();
		assert_eq!(stored.get("k1").map(String::as_str), Some("first"));
	}

	#[test]
	fn stored_content_is_cleaned() {
		let tmp = TempDir::new().unwrap();
		let mut source = MemorySource::new();
		source.push_page("comments", vec![Snippet::new("k1", "Wow, \u{201C}nice\u{201D} work!")]);

		let mut cache = cache_at(tmp.path().join("comments.json"));
		cache.bootstrap(&source, 15).unwrap();
		assert_eq!(cache.snippets().get("k1").map(String::as_str), Some("Wow nice work"));
	}
}
