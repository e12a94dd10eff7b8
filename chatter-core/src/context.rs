use std::collections::BTreeMap;

use log::warn;

use crate::config::Settings;
use crate::corpus::cache::{Bootstrap, CorpusCache};
use crate::corpus::source::SnippetSource;
use crate::error::CorpusError;

/// A corpus together with its fetch policy.
#[derive(Debug)]
struct Slot {
	cache: CorpusCache,
	initial_pages: usize,
	sync_pages: usize,
}

/// Process-wide state: one source handle shared by every corpus, and the
/// corpora indexed by name.
///
/// Whatever drives the polling loop owns a `Context` and passes it around
/// explicitly. All mutation goes through `&mut self`, so rounds on the same
/// corpus are serialized by construction.
#[derive(Debug)]
pub struct Context<S> {
	source: S,
	corpora: BTreeMap<String, Slot>,
}

impl<S: SnippetSource> Context<S> {
	/// Builds one empty cache per configured corpus.
	///
	/// # Errors
	/// Returns an error if `settings` do not validate.
	pub fn new(source: S, settings: &Settings) -> Result<Self, CorpusError> {
		settings.validate()?;

		let mut corpora = BTreeMap::new();
		for corpus in &settings.corpora {
			let cache = CorpusCache::new(
				&corpus.name,
				settings.owner_of(corpus),
				&settings.chain,
				settings.corpus_path(&corpus.name),
			)?;
			let slot = Slot { cache, initial_pages: corpus.initial_pages, sync_pages: corpus.sync_pages };
			corpora.insert(corpus.name.clone(), slot);
		}

		Ok(Self { source, corpora })
	}

	/// Shared source handle.
	pub fn source(&self) -> &S {
		&self.source
	}

	/// Bootstraps every corpus in name order, stopping at the first error.
	pub fn bootstrap(&mut self) -> Result<Vec<(String, Bootstrap)>, CorpusError> {
		let mut outcomes = Vec::with_capacity(self.corpora.len());
		for (name, slot) in &mut self.corpora {
			let outcome = slot.cache.bootstrap(&self.source, slot.initial_pages)?;
			outcomes.push((name.clone(), outcome));
		}
		Ok(outcomes)
	}

	/// Runs one sync round on every corpus.
	///
	/// A failing corpus does not prevent the others from syncing; each result
	/// is reported next to its corpus name.
	pub fn sync(&mut self) -> Vec<(String, Result<bool, CorpusError>)> {
		self.corpora
			.iter_mut()
			.map(|(name, slot)| {
				let result = slot.cache.sync(&self.source, slot.sync_pages);
				if let Err(e) = &result {
					warn!("Corpus '{}': sync failed: {}", name, e);
				}
				(name.clone(), result)
			})
			.collect()
	}

	/// Runs one sync round on the corpus called `name`.
	pub fn sync_corpus(&mut self, name: &str) -> Result<bool, CorpusError> {
		let slot = self
			.corpora
			.get_mut(name)
			.ok_or_else(|| CorpusError::UnknownCorpus(name.to_owned()))?;
		slot.cache.sync(&self.source, slot.sync_pages)
	}

	/// Generates at most `n` tokens from the corpus called `name`.
	pub fn generate(&self, name: &str, n: usize) -> Result<String, CorpusError> {
		self.corpus(name)
			.map(|cache| cache.generate(n))
			.ok_or_else(|| CorpusError::UnknownCorpus(name.to_owned()))
	}

	pub fn corpus(&self, name: &str) -> Option<&CorpusCache> {
		self.corpora.get(name).map(|slot| &slot.cache)
	}

	/// Iterates the corpora in name order.
	pub fn corpora(&self) -> impl Iterator<Item = &CorpusCache> {
		self.corpora.values().map(|slot| &slot.cache)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::CorpusConfig;
	use crate::corpus::snippet::Snippet;
	use crate::corpus::source::MemorySource;
	use crate::error::FetchError;
	use tempfile::TempDir;

	fn settings(dir: &TempDir) -> Settings {
		Settings {
			data_dir: dir.path().to_owned(),
			owner: "owner".into(),
			corpora: vec![CorpusConfig::new("comments"), CorpusConfig::new("replies")],
			..Settings::default()
		}
	}

	#[test]
	fn bootstraps_and_generates_per_corpus() {
		let tmp = TempDir::new().unwrap();
		let mut source = MemorySource::new();
		source.push_page("comments", vec![Snippet::new("c1", "great work here")]);
		source.push_page("replies", vec![Snippet::new("r1", "thanks a lot")]);

		let mut context = Context::new(source, &settings(&tmp)).unwrap();
		let outcomes = context.bootstrap().unwrap();
		assert_eq!(
			outcomes,
			vec![
				("comments".to_owned(), Bootstrap::Fetched { snippets: 1 }),
				("replies".to_owned(), Bootstrap::Fetched { snippets: 1 }),
			]
		);

		assert_eq!(context.generate("comments", 10).unwrap(), "great work here");
		assert_eq!(context.generate("replies", 10).unwrap(), "thanks a lot");
		assert!(matches!(context.generate("nope", 10), Err(CorpusError::UnknownCorpus(_))));
		assert_eq!(context.corpora().map(CorpusCache::name).collect::<Vec<_>>(), vec!["comments", "replies"]);
	}

	#[test]
	fn one_failing_corpus_does_not_block_the_others() {
		let tmp = TempDir::new().unwrap();
		let mut source = MemorySource::new();
		source.push_failure("comments", FetchError::Transport { page: 0, reason: "timeout".into() });
		source.push_page("replies", vec![Snippet::new("r1", "thanks")]);

		let mut context = Context::new(source, &settings(&tmp)).unwrap();
		let results = context.sync();
		assert_eq!(results.len(), 2);
		assert!(matches!(results[0], (ref name, Err(CorpusError::Fetch(_))) if name == "comments"));
		assert!(matches!(results[1], (ref name, Ok(true)) if name == "replies"));

		assert!(!context.sync_corpus("replies").unwrap());
		assert!(matches!(context.sync_corpus("nope"), Err(CorpusError::UnknownCorpus(_))));
	}

	#[test]
	fn dotted_corpus_names_bootstrap_independently() {
		let tmp = TempDir::new().unwrap();
		let mut source = MemorySource::new();
		source.push_page("notes.a", vec![Snippet::new("a1", "alpha text")]);
		source.push_page("notes.b", vec![Snippet::new("b1", "beta text")]);

		let mut settings = settings(&tmp);
		settings.corpora = vec![CorpusConfig::new("notes.a"), CorpusConfig::new("notes.b")];
		let mut context = Context::new(source, &settings).unwrap();

		let a = context.corpus("notes.a").unwrap().path().to_owned();
		let b = context.corpus("notes.b").unwrap().path().to_owned();
		assert_ne!(a, b);

		let outcomes = context.bootstrap().unwrap();
		assert_eq!(
			outcomes,
			vec![
				("notes.a".to_owned(), Bootstrap::Fetched { snippets: 1 }),
				("notes.b".to_owned(), Bootstrap::Fetched { snippets: 1 }),
			]
		);
		assert_eq!(context.generate("notes.a", 10).unwrap(), "alpha text");
		assert_eq!(context.generate("notes.b", 10).unwrap(), "beta text");
		assert!(a.exists() && b.exists());
	}

	#[test]
	fn rejects_invalid_settings() {
		let tmp = TempDir::new().unwrap();
		let mut invalid = settings(&tmp);
		invalid.corpora.push(CorpusConfig::new("replies"));
		assert!(matches!(Context::new(MemorySource::new(), &invalid), Err(CorpusError::Config(_))));
	}
}
