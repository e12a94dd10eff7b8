//! Token-level Markov chain used to generate text.
//!
//! - Fixed-order transition table (`TransitionModel`)
//! - Ring-buffer context window (`Prefix`, internal)

/// Fixed-order Markov chain (`order >= 1`).
///
/// Handles text ingestion, transition recording,
/// uniform random generation, and chain merging.
pub mod chain;

/// Fixed-length window over the last `order` tokens.
///
/// This module is not exposed publicly.
mod prefix;
