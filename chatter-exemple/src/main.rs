use log::info;

use chatter_core::io::read_file;
use chatter_core::{CorpusCache, MemorySource, Settings, Snippet};

/// Number of lines grouped into one page of the in-memory source.
const PAGE_SIZE: usize = 20;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Training text, one snippet per line
    let input = std::env::args().nth(1).unwrap_or_else(|| "./data/comments.txt".to_owned());
    let lines = read_file(&input)?;

    // Default settings: order 2 chain, "./data" as storage directory
    let settings = Settings::default();

    // Expose the lines as pages of a fake remote listing.
    // Keys are line numbers, so re-running with a longer file only adds the new lines.
    let mut source = MemorySource::new();
    let snippets: Vec<Snippet> = lines
        .into_iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| Snippet::new(format!("line-{i}"), line))
        .collect();
    for page in snippets.chunks(PAGE_SIZE) {
        source.push_page("comments", page.to_vec());
    }
    let pages = snippets.len().div_ceil(PAGE_SIZE);

    // First run: fetches every page and writes ./data/comments.json
    // Next runs: reads ./data/comments.json back, the source is not used
    let mut cache = CorpusCache::new(
        "comments",
        "exemple",
        &settings.chain,
        settings.corpus_path("comments"),
    )?;
    let outcome = cache.bootstrap(&source, pages)?;
    info!("Bootstrap: {:?}", outcome);

    // A sync round only reports a change when new keys show up
    let changed = cache.sync(&source, pages)?;
    info!("Sync changed anything: {}", changed);

    info!(
        "{} snippets, {} prefixes, {} transitions",
        cache.len(),
        cache.model().prefix_count(),
        cache.model().transition_count()
    );

    // Generate 10 texts of at most 30 tokens
    for i in 0..10 {
        println!("Generated text {}: {}", i + 1, cache.generate(30));
    }

    Ok(())
}
