use std::path::Path;

use serde::Deserialize;

use chatter_core::io::read_json;
use chatter_core::{CorpusError, Settings};

/// HTTP side of the configuration, under the `"server"` key.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
	pub bind: String,
	pub port: u16,
	/// Origin of the remote site snippets are fetched from
	pub base_url: String,
	pub timeout_secs: u64,
	/// Lower bound (inclusive) of the random length used when `n` is omitted
	pub min_n: usize,
	/// Upper bound (exclusive) of the random length used when `n` is omitted
	pub max_n: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			bind: "127.0.0.1".to_owned(),
			port: 5000,
			base_url: "https://www.khanacademy.org".to_owned(),
			timeout_secs: 10,
			min_n: 30,
			max_n: 50,
		}
	}
}

/// Whole configuration file: core settings at the top level, server
/// settings nested.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
	#[serde(flatten)]
	pub core: Settings,
	pub server: ServerConfig,
}

impl AppConfig {
	/// Reads the configuration at `path`, falling back to defaults if the
	/// file does not exist.
	///
	/// The defaults name no owner, so they never validate on their own.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
		let config: AppConfig = read_json(path)?.unwrap_or_default();
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), CorpusError> {
		self.core.validate()?;
		if self.server.min_n < 1 || self.server.min_n >= self.server.max_n {
			return Err(CorpusError::Config(format!(
				"expected 1 <= min_n < max_n, got min_n={} max_n={}",
				self.server.min_n, self.server.max_n
			)));
		}
		Ok(())
	}
}
