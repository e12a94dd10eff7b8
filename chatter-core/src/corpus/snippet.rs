use serde::{Deserialize, Serialize};

/// Characters stripped from every snippet before it is stored or learned:
/// question marks, commas, periods, exclamation marks, and straight and curly
/// quotes.
pub const DEFAULT_PUNCTUATION: &str = "?,.!\"'\u{201C}\u{201D}\u{2018}\u{2019}";

/// One unit of training text, identified by the remote source's stable key.
///
/// Deserializes from both `{"key", "content"}` and `{"Key", "Content"}`
/// payloads; any other field of the remote object is ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Snippet {
	#[serde(alias = "Key")]
	pub key: String,
	#[serde(alias = "Content")]
	pub content: String,
}

impl Snippet {
	pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
		Self { key: key.into(), content: content.into() }
	}
}

/// Ordered group of snippets delivered together by a source.
pub type SnippetPage = Vec<Snippet>;

/// Removes a fixed set of characters from snippet content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Punctuation {
	chars: Vec<char>,
}

impl Punctuation {
	/// Builds a cleaner stripping every character of `set`.
	pub fn new(set: &str) -> Self {
		let mut chars: Vec<char> = set.chars().collect();
		chars.sort_unstable();
		chars.dedup();
		Self { chars }
	}

	/// Returns `text` without any character of the set.
	///
	/// Removal never introduces a new stripped character, so cleaning is
	/// idempotent.
	pub fn clean(&self, text: &str) -> String {
		text.chars().filter(|c| self.chars.binary_search(c).is_err()).collect()
	}

	/// Cleans the content of a snippet, keeping its key.
	pub fn clean_snippet(&self, snippet: Snippet) -> Snippet {
		Snippet { content: self.clean(&snippet.content), key: snippet.key }
	}
}

impl Default for Punctuation {
	fn default() -> Self {
		Self::new(DEFAULT_PUNCTUATION)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_default_set() {
		let cleaner = Punctuation::default();
		assert_eq!(cleaner.clean("Hello, world! Is it \"you\"?"), "Hello world Is it you");
		assert_eq!(cleaner.clean("it\u{2019}s \u{201C}fine\u{201D}."), "its fine");
		assert_eq!(cleaner.clean("don't"), "dont");
	}

	#[test]
	fn keeps_spacing_untouched() {
		let cleaner = Punctuation::default();
		assert_eq!(cleaner.clean("a , b"), "a  b");
		assert_eq!(cleaner.clean(""), "");
	}

	#[test]
	fn cleaning_is_idempotent() {
		let cleaner = Punctuation::default();
		for text in [
			"Nice program!!! How did you do this??",
			"\u{2018}quoted\u{2019}, \u{201C}double\u{201D}...",
			"no punctuation here",
			"?!.,",
			"mixed: semicolons; stay-put",
		] {
			let once = cleaner.clean(text);
			assert_eq!(cleaner.clean(&once), once);
		}
	}

	#[test]
	fn custom_set() {
		let cleaner = Punctuation::new("xy");
		assert_eq!(cleaner.clean("xaybx!"), "ab!");
	}

	#[test]
	fn decodes_remote_field_names() {
		let page: SnippetPage =
			serde_json::from_str(r#"[{"Key": "k1", "Content": "hi", "Extra": 3}, {"key": "k2", "content": "yo"}]"#)
				.unwrap();
		assert_eq!(page, vec![Snippet::new("k1", "hi"), Snippet::new("k2", "yo")]);
	}
}
