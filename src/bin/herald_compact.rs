//! Offline compaction of every series file below the data directory
//!
//! Run it while the refresher is stopped; it rewrites files in place.
//!
//! Usage:
//!   cargo run --release --bin herald_compact
//!
//! Environment variables:
//!   HERALD_DATA_DIR - series root (default: data)

use dotenv::dotenv;
use herald::{
    timeseries::{storage::load_file, COMPACTION_WINDOW_DAYS},
    HeraldConfig,
};
use log::{info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Default)]
struct CompactStats {
    files: usize,
    rewritten: usize,
    entries_before: usize,
    entries_after: usize,
    skipped: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = HeraldConfig::from_env();
    info!(
        "🧹 Compacting series in {} ({}-day window)",
        config.data_dir.display(),
        COMPACTION_WINDOW_DAYS
    );

    let mut files = Vec::new();
    collect_series_files(&config.data_dir, &mut files)?;
    files.sort();

    let mut stats = CompactStats::default();
    for path in &files {
        stats.files += 1;
        let mut series = match load_file(path) {
            Ok(series) => series,
            Err(e) => {
                warn!("⚠️  Skipping {}: {}", path.display(), e);
                stats.skipped += 1;
                continue;
            }
        };

        let before = series.len();
        series.compact();
        stats.entries_before += before;
        stats.entries_after += series.len();

        if series.len() < before {
            if let Err(e) = series.save(path) {
                warn!("⚠️  Failed to rewrite {}: {}", path.display(), e);
                stats.skipped += 1;
                continue;
            }
            stats.rewritten += 1;
        }
    }

    info!("✅ Compaction done");
    info!(
        "   ├─ Files: {} ({} rewritten, {} skipped)",
        stats.files, stats.rewritten, stats.skipped
    );
    info!("   └─ Entries: {} -> {}", stats.entries_before, stats.entries_after);
    Ok(())
}

fn collect_series_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_series_files(&path, out)?;
        } else if path.to_string_lossy().ends_with(".json.gz") {
            out.push(path);
        }
    }
    Ok(())
}
