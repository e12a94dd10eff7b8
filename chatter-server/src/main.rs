use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;
use std::env;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use log::info;
use rand::Rng;
use serde::Deserialize;

use chatter_core::io::{list_files, CORPUS_EXTENSION};
use chatter_core::{Context, CorpusError, SnippetSource};

mod config;
mod source;

use config::{AppConfig, ServerConfig};
use source::HttpSource;

/// Configuration file read when no path is given on the command line.
const DEFAULT_CONFIG: &str = "chatter.json";

/// Any source the server can be wired to.
type DynSource = Box<dyn SnippetSource + Send + Sync>;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	corpus: Option<String>,
	n: Option<usize>,
}

#[derive(Deserialize)]
struct SyncQuery {
	corpus: Option<String>,
}

struct SharedData {
	context: Mutex<Context<DynSource>>,
	server: ServerConfig,
	data_dir: PathBuf,
}

impl SharedData {
	/// Locks the context for a read-only handler.
	///
	/// A sync round holds the lock for as long as the remote fetch takes, so
	/// readers do not wait for it on a worker thread: they answer 503 instead.
	fn try_context(&self) -> Result<MutexGuard<'_, Context<DynSource>>, HttpResponse> {
		match self.context.try_lock() {
			Ok(context) => Ok(context),
			Err(TryLockError::WouldBlock) => Err(HttpResponse::ServiceUnavailable().body("Sync in progress, retry later")),
			Err(TryLockError::Poisoned(_)) => Err(HttpResponse::InternalServerError().body("Context lock failed")),
		}
	}
}

impl GenerateParams {
	/// Resolves the requested number of tokens.
	///
	/// Without `n`, a length is drawn from `[min_n, max_n)`.
	fn length(&self, server: &ServerConfig) -> Result<usize, String> {
		match self.n {
			Some(0) => Err("n must be >= 1".into()),
			Some(n) => Ok(n),
			None => Ok(rand::rng().random_range(server.min_n..server.max_n)),
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates a sequence from the chain of the requested corpus.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let corpus = match &query.corpus {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty corpus name"),
	};

	let n = match query.length(&data.server) {
		Ok(n) => n,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let context = match data.try_context() {
		Ok(c) => c,
		Err(response) => return response,
	};

	match context.generate(corpus, n) {
		Ok(result) => HttpResponse::Ok().body(result),
		Err(e @ CorpusError::UnknownCorpus(_)) => HttpResponse::NotFound().body(e.to_string()),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP GET endpoint `/v1/corpora`
///
/// One `name\tsnippets\tprefixes` line per loaded corpus.
#[get("/v1/corpora")]
async fn get_corpora(data: web::Data<SharedData>) -> impl Responder {
	let context = match data.try_context() {
		Ok(c) => c,
		Err(response) => return response,
	};

	let lines: Vec<String> = context
		.corpora()
		.map(|cache| format!("{}\t{}\t{}", cache.name(), cache.len(), cache.model().prefix_count()))
		.collect();
	HttpResponse::Ok().body(lines.join("\n"))
}

/// HTTP GET endpoint `/v1/stored`
///
/// Lists the corpora persisted in the data directory.
#[get("/v1/stored")]
async fn get_stored(data: web::Data<SharedData>) -> impl Responder {
	let suffix = format!(".{CORPUS_EXTENSION}");
	match list_files(&data.data_dir, CORPUS_EXTENSION) {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(&suffix, "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list stored corpora"),
	}
}

/// HTTP PUT endpoint `/v1/sync`
///
/// Runs one sync round, for a single corpus when `corpus` is given, for all
/// of them otherwise. The round runs on the blocking pool since it performs
/// network and file I/O.
#[put("/v1/sync")]
async fn put_sync(data: web::Data<SharedData>, query: web::Query<SyncQuery>) -> impl Responder {
	let shared = data.clone();
	let corpus = query.corpus.clone();

	let outcome = web::block(move || {
		let mut context = shared.context.lock().map_err(|_| "Context lock failed".to_owned())?;
		let results = match corpus {
			Some(name) => {
				let result = context.sync_corpus(&name);
				vec![(name, result)]
			}
			None => context.sync(),
		};
		Ok::<_, String>(results)
	})
	.await;

	let results = match outcome {
		Ok(Ok(results)) => results,
		Ok(Err(e)) => return HttpResponse::InternalServerError().body(e),
		Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
	};

	let (body, status) = render_sync(&results);
	HttpResponse::build(status).body(body)
}

/// Renders sync results, one `name\toutcome` line per corpus, along with
/// the status code summarizing them.
fn render_sync(results: &[(String, Result<bool, CorpusError>)]) -> (String, actix_web::http::StatusCode) {
	use actix_web::http::StatusCode;

	let mut status = StatusCode::OK;
	let mut lines = Vec::with_capacity(results.len());
	for (name, result) in results {
		let outcome = match result {
			Ok(true) => "changed".to_owned(),
			Ok(false) => "unchanged".to_owned(),
			Err(e @ CorpusError::UnknownCorpus(_)) => {
				status = StatusCode::NOT_FOUND;
				e.to_string()
			}
			Err(e) => {
				if status == StatusCode::OK {
					status = StatusCode::BAD_GATEWAY;
				}
				format!("error: {e}")
			}
		};
		lines.push(format!("{name}\t{outcome}"));
	}
	(lines.join("\n"), status)
}

fn app_data(context: Context<DynSource>, server: ServerConfig, data_dir: PathBuf) -> web::Data<SharedData> {
	web::Data::new(SharedData { context: Mutex::new(context), server, data_dir })
}

/// Main entry point for the server.
///
/// Loads the configuration, bootstraps every corpus (from disk, or from the
/// remote site on first run), then starts an Actix-web HTTP server.
///
/// # Notes
/// - The configuration path is the first argument, `chatter.json` by default.
/// - Bootstrap runs before the async runtime starts; the blocking HTTP client
///   must not run on it.
/// - Sync rounds are triggered through `PUT /v1/sync`; scheduling them is
///   left to the caller.
fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_owned());
	let config = AppConfig::load(&config_path)?;
	info!("Loaded configuration from {}", config_path);

	let source: DynSource = Box::new(HttpSource::new(
		&config.server.base_url,
		Duration::from_secs(config.server.timeout_secs),
	));
	let mut context = Context::new(source, &config.core)?;

	info!("Gathering startup notes...");
	for (name, outcome) in context.bootstrap()? {
		info!("Corpus '{}' ready: {:?}", name, outcome);
	}

	let (bind, port) = (config.server.bind.clone(), config.server.port);
	let shared = app_data(context, config.server, config.core.data_dir);

	info!("Listening on {}:{}", bind, port);
	actix_web::rt::System::new().block_on(async move {
		HttpServer::new(move || {
			App::new()
				.wrap(Cors::permissive())
				.app_data(shared.clone())
				.service(get_generated)
				.service(get_corpora)
				.service(get_stored)
				.service(put_sync)
		})
			.bind((bind, port))?
			.run()
			.await
	})?;

	Ok(())
}
