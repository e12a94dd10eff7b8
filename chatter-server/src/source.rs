use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;

use chatter_core::{FetchError, Pages, SnippetPage, SnippetSource, spawn_pages};

/// Snippet source backed by the remote site's per-user listing endpoint.
///
/// `GET {base_url}/api/internal/user/{corpus}?username={owner}&page={i}`
/// returns a JSON list of `{ "key", "content" }` objects, newest first.
///
/// Pages are requested one after another on a producer thread (see
/// [`spawn_pages`]), so the blocking client never runs inside the async
/// runtime.
#[derive(Clone, Debug)]
pub struct HttpSource {
	base_url: String,
	timeout: Duration,
}

impl HttpSource {
	pub fn new(base_url: &str, timeout: Duration) -> Self {
		Self { base_url: base_url.trim_end_matches('/').to_owned(), timeout }
	}

	/// Listing endpoint of `corpus`.
	fn listing_url(&self, corpus: &str) -> String {
		format!("{}/api/internal/user/{}", self.base_url, corpus)
	}
}

impl SnippetSource for HttpSource {
	fn fetch_snippets(&self, corpus: &str, owner: &str, page_count: usize) -> Pages<'_> {
		let url = self.listing_url(corpus);
		let owner = owner.to_owned();
		let timeout = self.timeout;
		let mut client: Option<Client> = None;

		spawn_pages(page_count, move |page| {
			if let Some(client) = &client {
				return fetch_page(client, &url, &owner, page);
			}
			let fresh = Client::builder()
				.timeout(timeout)
				.build()
				.map_err(|e| FetchError::Transport { page, reason: e.to_string() })?;
			let result = fetch_page(&fresh, &url, &owner, page);
			client = Some(fresh);
			result
		})
	}
}

/// Requests and decodes one page.
fn fetch_page(client: &Client, url: &str, owner: &str, page: usize) -> Result<SnippetPage, FetchError> {
	debug!("GET {} (username={}, page={})", url, owner, page);
	let page_param = page.to_string();
	let response = client
		.get(url)
		.query(&[("username", owner), ("page", page_param.as_str())])
		.send()
		.map_err(|e| FetchError::Transport { page, reason: e.to_string() })?;

	let status = response.status();
	if !status.is_success() {
		return Err(FetchError::Status { page, status: status.as_u16() });
	}

	let body = response.text().map_err(|e| FetchError::Transport { page, reason: e.to_string() })?;
	decode_page(&body, page)
}

/// Decodes a listing body. A `null` body is an empty page.
fn decode_page(body: &str, page: usize) -> Result<SnippetPage, FetchError> {
	serde_json::from_str::<Option<SnippetPage>>(body)
		.map(Option::unwrap_or_default)
		.map_err(|e| FetchError::Decode { page, reason: e.to_string() })
}

#[cfg(test)]
mod tests {
	use super::*;
	use chatter_core::Snippet;

	#[test]
	fn listing_url_ignores_trailing_slash() {
		let source = HttpSource::new("https://example.org/", Duration::from_secs(1));
		assert_eq!(source.listing_url("replies"), "https://example.org/api/internal/user/replies");
	}

	#[test]
	fn decodes_listing_bodies() {
		let page = decode_page(r#"[{"key": "k1", "content": "Nice!", "authorNickname": "x"}]"#, 0).unwrap();
		assert_eq!(page, vec![Snippet::new("k1", "Nice!")]);
		assert!(decode_page("null", 0).unwrap().is_empty());
		assert!(decode_page("[]", 0).unwrap().is_empty());
	}

	#[test]
	fn undecodable_body_is_a_decode_error() {
		let error = decode_page("<html>maintenance</html>", 3).unwrap_err();
		assert!(error.is_decode());
		assert!(matches!(error, FetchError::Decode { page: 3, .. }));
	}

	#[test]
	fn unreachable_host_is_a_transport_error() {
		// Port 9 (discard) on localhost is expected to refuse connections.
		let source = HttpSource::new("http://127.0.0.1:9", Duration::from_millis(500));
		let pages: Vec<_> = source.fetch_snippets("comments", "owner", 3).collect();
		assert_eq!(pages.len(), 1);
		assert!(matches!(pages[0], Err(FetchError::Transport { page: 0, .. })));
	}
}
