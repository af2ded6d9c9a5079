//! Load text resources given on the command line
//!
//! This example demonstrates:
//! - Registering a decoder
//! - Wiring lifecycle handlers
//! - Bounding concurrency with `batch_size`
//! - Aborting the batch on Ctrl+C
//!
//! ```text
//! cargo run --example load_urls -- https://example.com/a.txt https://example.com/b.txt
//! ```

use batch_loader::decoder::TextDecoder;
use batch_loader::{Config, FetchScheduler, LoadOptions, Resource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let resources: Vec<Resource> = std::env::args().skip(1).map(Resource::from).collect();
    if resources.is_empty() {
        eprintln!("usage: load_urls <url>...");
        return Ok(());
    }

    let mut scheduler: FetchScheduler<String> = FetchScheduler::new(Config::default())?;
    scheduler.register_decoder(TextDecoder::with_extensions(["txt", "csv", "json", "md"]));

    scheduler
        .on_load_start(|e| println!("Loading {} resource(s)", e.source.len()))
        .on_progress(|e| println!("  [{:>5.1}%] {} ({:?})", e.loaded, e.source, e.phase))
        .on_load_item(|e| println!("✓ {} ({} chars)", e.source, e.data.chars().count()))
        .on_error(|e| eprintln!("✗ {}: {}", e.source, e.error))
        .on_abort(|e| eprintln!("⊘ {} aborted", e.source))
        .on_load(|_| println!("All resources loaded"));

    // Abort on Ctrl+C
    let abort = scheduler.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let summary = scheduler
        .load(
            resources,
            LoadOptions {
                batch_size: Some(4),
                ..Default::default()
            },
        )
        .await?;

    println!(
        "Done: {} loaded, {} failed, {} aborted, {} skipped",
        summary.loaded,
        summary.errored,
        summary.aborted,
        summary.skipped()
    );
    Ok(())
}
