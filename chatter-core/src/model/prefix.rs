use std::fmt;

/// Token separator used both to split training text and to render keys.
pub(crate) const SEPARATOR: &str = " ";

/// Fixed-length window over the last `k` tokens seen by a chain.
///
/// The window is a ring buffer: [`Prefix::advance`] overwrites the oldest
/// slot in place and moves the head, so no token is ever shifted and the
/// buffer is never resized after construction.
///
/// ## Invariants
/// - `tokens.len()` is the chain order and stays constant
/// - `head` always indexes the oldest token
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Prefix {
	tokens: Box<[String]>,
	head: usize,
}

impl Prefix {
	/// Creates a window of `order` empty tokens, the start state of every
	/// learning pass and every generation walk.
	pub fn new(order: usize) -> Self {
		Self {
			tokens: vec![String::new(); order].into_boxed_slice(),
			head: 0,
		}
	}

	/// Drops the oldest token and appends `token` as the newest.
	pub fn advance(&mut self, token: &str) {
		if self.tokens.is_empty() {
			return;
		}
		let slot = &mut self.tokens[self.head];
		slot.clear();
		slot.push_str(token);
		self.head = (self.head + 1) % self.tokens.len();
	}

	/// Iterates the tokens from oldest to newest.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		let (newer, older) = self.tokens.split_at(self.head);
		older.iter().chain(newer.iter()).map(String::as_str)
	}

	/// Renders the window as a transition table key.
	pub fn key(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for Prefix {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, token) in self.iter().enumerate() {
			if i > 0 {
				write!(f, "{SEPARATOR}")?;
			}
			f.write_str(token)?;
		}
		Ok(())
	}
}

/// Renders an arbitrary token slice the same way a [`Prefix`] renders itself.
pub(crate) fn render_key(tokens: &[&str]) -> String {
	tokens.join(SEPARATOR)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_window_renders_separators_only() {
		assert_eq!(Prefix::new(1).key(), "");
		assert_eq!(Prefix::new(2).key(), " ");
		assert_eq!(Prefix::new(3).key(), "  ");
	}

	#[test]
	fn advance_drops_oldest_token() {
		let mut prefix = Prefix::new(2);
		prefix.advance("the");
		assert_eq!(prefix.key(), " the");
		prefix.advance("cat");
		assert_eq!(prefix.key(), "the cat");
		prefix.advance("sat");
		assert_eq!(prefix.key(), "cat sat");
		assert_eq!(prefix.iter().collect::<Vec<_>>(), vec!["cat", "sat"]);
	}

	#[test]
	fn wraps_around_many_times_without_growing() {
		let mut prefix = Prefix::new(3);
		for i in 0..100 {
			prefix.advance(&i.to_string());
		}
		assert_eq!(prefix.iter().count(), 3);
		assert_eq!(prefix.key(), "97 98 99");
	}

	#[test]
	fn render_key_matches_prefix_rendering() {
		let mut prefix = Prefix::new(2);
		prefix.advance("a");
		prefix.advance("b");
		assert_eq!(render_key(&["a", "b"]), prefix.key());
		assert_eq!(render_key(&["", ""]), Prefix::new(2).key());
	}
}
