use std::collections::HashMap;
use std::thread;

use rand::Rng;
use rand::seq::IndexedRandom;

use super::prefix::{render_key, Prefix, SEPARATOR};
use crate::error::CorpusError;

/// Below this many texts, `learn_all` stays on the calling thread.
const PARALLEL_THRESHOLD: usize = 512;
/// Number of chunks per CPU when splitting a bulk replay.
const CHUNK_FACTOR: usize = 8;

/// Fixed-order Markov chain over space-separated tokens.
///
/// The model maps a rendered prefix of `order` tokens to every token that was
/// observed right after it. Candidate lists keep duplicates in observation
/// order, so a token seen three times after a prefix is three times as likely
/// to be picked during generation.
///
/// # Responsibilities
/// - Learn token transitions from raw text
/// - Generate new text by walking the chain from the empty prefix
/// - Merge with another chain of the same order (bulk replay support)
///
/// # Invariants
/// - `order` is always >= 1
/// - Every key of `table` renders exactly `order` tokens
/// - Candidate lists are only appended to, never shrunk
#[derive(Clone, Debug)]
pub struct TransitionModel {
	/// Number of preceding tokens used as context
	order: usize,

	/// Rendered prefix -> tokens observed after it
	table: HashMap<String, Vec<String>>,
}

impl TransitionModel {
	/// Creates an empty chain of the given order.
	///
	/// # Errors
	/// Returns [`CorpusError::InvalidOrder`] if `order < 1`.
	pub fn new(order: usize) -> Result<Self, CorpusError> {
		if order < 1 {
			return Err(CorpusError::InvalidOrder(order));
		}
		Ok(Self { order, table: HashMap::new() })
	}

	/// Returns the chain order.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Number of distinct prefixes with at least one candidate.
	pub fn prefix_count(&self) -> usize {
		self.table.len()
	}

	/// Total number of recorded transitions, duplicates included.
	pub fn transition_count(&self) -> usize {
		self.table.values().map(Vec::len).sum()
	}

	/// Returns `true` if nothing has been learned yet.
	pub fn is_empty(&self) -> bool {
		self.table.is_empty()
	}

	/// Returns the candidates recorded after the given prefix tokens.
	///
	/// An unknown prefix yields an empty slice.
	pub fn candidates(&self, prefix: &[&str]) -> &[String] {
		self.table
			.get(&render_key(prefix))
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	/// Adds one text to the chain.
	///
	/// # Notes
	/// - Splits on every single space and keeps the empty tokens this
	///   produces, so `"a  b"` learns `a`, `""`, `b`.
	/// - Each text starts from the empty prefix, which is what lets
	///   [`TransitionModel::generate`] find a starting point.
	pub fn learn(&mut self, text: &str) {
		let mut prefix = Prefix::new(self.order);
		for token in text.split(SEPARATOR) {
			self.table.entry(prefix.key()).or_default().push(token.to_owned());
			prefix.advance(token);
		}
	}

	/// Learns a batch of texts, in parallel for large batches.
	///
	/// # Behavior
	/// - Splits the batch into chunks (based on CPU cores * factor).
	/// - Builds a partial chain per chunk on a scoped thread.
	/// - Merges the partial chains back in chunk order.
	///
	/// The resulting table is the same as calling [`TransitionModel::learn`]
	/// on every text in slice order.
	pub fn learn_all<T>(&mut self, texts: &[T])
	where
		T: AsRef<str> + Sync,
	{
		if texts.len() < PARALLEL_THRESHOLD {
			for text in texts {
				self.learn(text.as_ref());
			}
			return;
		}

		let chunks = num_cpus::get() * CHUNK_FACTOR;
		let chunk_size = texts.len().div_ceil(chunks);
		let order = self.order;

		let partials: Vec<TransitionModel> = thread::scope(|scope| {
			let handles: Vec<_> = texts
				.chunks(chunk_size)
				.map(|chunk| {
					scope.spawn(move || {
						let mut partial = TransitionModel { order, table: HashMap::new() };
						for text in chunk {
							partial.learn(text.as_ref());
						}
						partial
					})
				})
				.collect();

			handles
				.into_iter()
				.map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
				.collect()
		});

		for partial in partials {
			self.absorb(partial);
		}
	}

	/// Generates at most `n` tokens using the thread-local RNG.
	pub fn generate(&self, n: usize) -> String {
		self.generate_with(n, &mut rand::rng())
	}

	/// Generates at most `n` tokens, drawing choices from `rng`.
	///
	/// The walk starts from the empty prefix and stops early as soon as the
	/// current prefix has no candidates. An untrained chain yields `""`.
	pub fn generate_with<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> String {
		let mut prefix = Prefix::new(self.order);
		let mut words: Vec<&str> = Vec::new();

		while words.len() < n {
			let Some(next) = self.table.get(&prefix.key()).and_then(|choices| choices.choose(rng)) else {
				break;
			};
			words.push(next);
			prefix.advance(next);
		}

		words.join(SEPARATOR)
	}

	/// Merges another chain into this one.
	///
	/// Candidate lists of `other` are appended after the existing ones.
	///
	/// # Errors
	/// Returns [`CorpusError::OrderMismatch`] if the orders differ.
	pub fn merge(&mut self, other: TransitionModel) -> Result<(), CorpusError> {
		if self.order != other.order {
			return Err(CorpusError::OrderMismatch { expected: self.order, found: other.order });
		}
		self.absorb(other);
		Ok(())
	}

	fn absorb(&mut self, other: TransitionModel) {
		for (key, candidates) in other.table {
			self.table.entry(key).or_default().extend(candidates);
		}
	}
}
