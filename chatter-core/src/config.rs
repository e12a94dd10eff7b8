use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::corpus::snippet::DEFAULT_PUNCTUATION;
use crate::error::CorpusError;
use crate::io::{corpus_path, read_json};

/// Default number of tokens of context.
pub const DEFAULT_ORDER: usize = 2;
/// Default number of pages fetched when a corpus has no persisted image.
pub const DEFAULT_INITIAL_PAGES: usize = 15;
/// Default number of pages fetched by each sync round.
pub const DEFAULT_SYNC_PAGES: usize = 2;

/// Shape of every chain and cleaner built from these settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
	/// Number of preceding tokens used as context (>= 1)
	pub order: usize,
	/// Characters stripped from incoming snippets
	pub punctuation: String,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self { order: DEFAULT_ORDER, punctuation: DEFAULT_PUNCTUATION.to_owned() }
	}
}

/// One named corpus and its fetch policy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CorpusConfig {
	pub name: String,
	#[serde(default = "default_initial_pages")]
	pub initial_pages: usize,
	#[serde(default = "default_sync_pages")]
	pub sync_pages: usize,
	/// Overrides [`Settings::owner`] for this corpus.
	#[serde(default)]
	pub owner: Option<String>,
}

fn default_initial_pages() -> usize {
	DEFAULT_INITIAL_PAGES
}

fn default_sync_pages() -> usize {
	DEFAULT_SYNC_PAGES
}

impl CorpusConfig {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			initial_pages: DEFAULT_INITIAL_PAGES,
			sync_pages: DEFAULT_SYNC_PAGES,
			owner: None,
		}
	}
}

/// Process-wide settings, read from a JSON file.
///
/// Every field is optional in the file; missing ones take their default.
///
/// ```json
/// {
/// 	"data_dir": "./data",
/// 	"owner": "someone",
/// 	"chain": { "order": 2 },
/// 	"corpora": [{ "name": "comments" }, { "name": "replies", "sync_pages": 1 }]
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
	/// Directory holding one `<corpus>.json` file per corpus
	pub data_dir: PathBuf,
	/// Account whose snippets are sampled
	pub owner: String,
	pub chain: ChainConfig,
	pub corpora: Vec<CorpusConfig>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("./data"),
			owner: String::new(),
			chain: ChainConfig::default(),
			corpora: vec![CorpusConfig::new("comments"), CorpusConfig::new("replies")],
		}
	}
}

impl Settings {
	/// Reads and validates settings from `path`.
	///
	/// # Errors
	/// - [`CorpusError::Read`] if the file is missing or unreadable
	/// - [`CorpusError::Malformed`] if it is not valid JSON settings
	/// - [`CorpusError::Config`] / [`CorpusError::InvalidOrder`] if validation fails
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
		let path = path.as_ref();
		let settings: Settings = read_json(path)?.ok_or_else(|| CorpusError::Read {
			path: path.to_owned(),
			source: io::Error::new(io::ErrorKind::NotFound, "settings file not found"),
		})?;
		settings.validate()?;
		Ok(settings)
	}

	/// Checks the invariants the rest of the crate relies on.
	///
	/// Every corpus must resolve to a non-empty owner and to its own file.
	pub fn validate(&self) -> Result<(), CorpusError> {
		if self.chain.order < 1 {
			return Err(CorpusError::InvalidOrder(self.chain.order));
		}
		if self.corpora.is_empty() {
			return Err(CorpusError::Config("at least one corpus must be configured".to_owned()));
		}

		let mut seen = HashSet::new();
		for corpus in &self.corpora {
			if corpus.name.trim().is_empty() {
				return Err(CorpusError::Config("corpus name cannot be empty".to_owned()));
			}
			if corpus.name.contains(['/', '\\']) {
				return Err(CorpusError::Config(format!("corpus name '{}' cannot contain a path separator", corpus.name)));
			}
			if matches!(corpus.name.as_str(), "." | "..") {
				return Err(CorpusError::Config(format!("'{}' is not a valid corpus name", corpus.name)));
			}
			if self.owner_of(corpus).trim().is_empty() {
				return Err(CorpusError::Config(format!("no owner set for corpus '{}'", corpus.name)));
			}
			if !seen.insert(corpus.name.as_str()) {
				return Err(CorpusError::Config(format!("corpus '{}' is configured twice", corpus.name)));
			}
		}
		Ok(())
	}

	/// Owner to fetch `corpus` for.
	pub fn owner_of<'a>(&'a self, corpus: &'a CorpusConfig) -> &'a str {
		corpus.owner.as_deref().unwrap_or(&self.owner)
	}

	/// Path of the persisted image of the corpus called `name`.
	pub fn corpus_path(&self, name: &str) -> PathBuf {
		corpus_path(&self.data_dir, name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[test]
	fn defaults_fill_missing_fields() {
		let settings: Settings =
			serde_json::from_str(r#"{"owner": "someone", "corpora": [{"name": "comments"}]}"#).unwrap();
		assert_eq!(settings.data_dir, PathBuf::from("./data"));
		assert_eq!(settings.chain, ChainConfig::default());
		assert_eq!(settings.corpora[0].initial_pages, DEFAULT_INITIAL_PAGES);
		assert_eq!(settings.corpora[0].sync_pages, DEFAULT_SYNC_PAGES);
		assert_eq!(settings.owner_of(&settings.corpora[0]), "someone");
		settings.validate().unwrap();
	}

	#[test]
	fn corpus_owner_overrides_global_owner() {
		let mut settings = Settings::default();
		settings.owner = "global".into();
		settings.corpora[1].owner = Some("local".into());
		assert_eq!(settings.owner_of(&settings.corpora[0]), "global");
		assert_eq!(settings.owner_of(&settings.corpora[1]), "local");
	}

	fn owned() -> Settings {
		Settings { owner: "someone".into(), ..Settings::default() }
	}

	#[test]
	fn validation_rejects_bad_settings() {
		owned().validate().unwrap();

		let mut settings = owned();
		settings.chain.order = 0;
		assert!(matches!(settings.validate(), Err(CorpusError::InvalidOrder(0))));

		let mut settings = owned();
		settings.corpora.push(CorpusConfig::new("comments"));
		assert!(matches!(settings.validate(), Err(CorpusError::Config(_))));

		let mut settings = owned();
		settings.corpora.clear();
		assert!(matches!(settings.validate(), Err(CorpusError::Config(_))));

		let mut settings = owned();
		settings.corpora[0].name = "../escape".into();
		assert!(matches!(settings.validate(), Err(CorpusError::Config(_))));

		for name in [".", ".."] {
			let mut settings = owned();
			settings.corpora[0].name = name.into();
			assert!(matches!(settings.validate(), Err(CorpusError::Config(_))), "{name} accepted");
		}
	}

	#[test]
	fn every_corpus_needs_an_owner() {
		assert!(matches!(Settings::default().validate(), Err(CorpusError::Config(_))));

		let mut settings = Settings::default();
		settings.corpora[0].owner = Some("local".into());
		assert!(matches!(settings.validate(), Err(CorpusError::Config(msg)) if msg.contains("replies")));

		settings.corpora[1].owner = Some("other".into());
		settings.validate().unwrap();

		let mut settings = owned();
		settings.corpora[0].owner = Some(" ".into());
		assert!(matches!(settings.validate(), Err(CorpusError::Config(msg)) if msg.contains("comments")));
	}

	#[test]
	fn load_reads_file_and_reports_missing_one() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("chatter.json");
		assert!(matches!(Settings::load(&path), Err(CorpusError::Read { .. })));

		fs::write(&path, r#"{"data_dir": "/var/lib/chatter", "owner": "someone", "chain": {"order": 3}}"#).unwrap();
		let settings = Settings::load(&path).unwrap();
		assert_eq!(settings.chain.order, 3);
		assert_eq!(settings.corpus_path("replies"), PathBuf::from("/var/lib/chatter/replies.json"));
	}
}
