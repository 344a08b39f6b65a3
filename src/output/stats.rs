//! Yield statistics export and end-of-run reporting

use crate::crawler::CrawlReport;
use crate::output::traits::OutputResult;
use crate::state::YieldStats;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the per-collection statistics as a pretty-printed JSON object
///
/// The object maps each collection id to `{"items": n, "files": m}`.
pub fn write_stats_json(path: &Path, stats: &YieldStats) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, stats)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Prints the crawl outcome and the most productive collections to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Summary ===\n");

    println!("Outcome: {}", report.outcome);
    println!("  Visits: {}", report.visits);
    println!("  Files discovered: {}", report.total_files);
    println!("  Unique items: {}", report.visited_items);
    println!("  Unique collections: {}", report.visited_collections);
    println!("  Left in frontier: {}", report.frontier_remaining);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!();

    let mut productive: Vec<_> = report
        .stats
        .iter()
        .filter(|(_, yield_)| yield_.files_found > 0)
        .collect();
    productive.sort_by(|a, b| b.1.files_found.cmp(&a.1.files_found).then(a.0.cmp(b.0)));

    if !productive.is_empty() {
        println!("Top Collections:");
        for (collection, yield_) in productive.into_iter().take(10) {
            println!(
                "  {}: {} files / {} items",
                collection, yield_.files_found, yield_.items_seen
            );
        }
        println!();
    }
}
