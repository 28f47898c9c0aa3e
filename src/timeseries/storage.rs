//! Gzip/JSON persistence and path layout for series files

use {
    super::{Category, Metric, TimeSeries},
    crate::error::{HeraldError, Result},
    chrono::{DateTime, Utc},
    flate2::{read::GzDecoder, write::GzEncoder, Compression},
    std::{
        collections::{hash_map::Entry, HashMap, HashSet},
        fs::{self, File},
        io::{BufReader, BufWriter, ErrorKind, Read, Write},
        path::{Path, PathBuf},
    },
};

/// `<root>/<category>/<first two chars of metric>/<metric>/<key>.json.gz`
///
/// Metric and key are lower-cased. Path separators inside a key are replaced
/// with `_` so a guild name cannot escape the data directory.
pub fn series_path(root: &Path, category: &str, metric: &str, key: &str) -> PathBuf {
    let metric = metric.to_lowercase();
    let shard: String = metric.chars().take(2).collect();

    root.join(category)
        .join(shard)
        .join(&metric)
        .join(format!("{}.json.gz", series_key(key)))
}

/// File stem a key is stored under
pub fn series_key(key: &str) -> String {
    key.to_lowercase()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Keys that lose their series file to another key
///
/// Keys that differ only in case share a file stem. Of each such group the
/// smallest key keeps the file and all others are returned here; they get no
/// history.
pub fn shadowed_keys<'a, I>(keys: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut owner_by_stem: HashMap<String, &str> = HashMap::new();
    let mut shadowed = HashSet::new();
    for key in keys {
        match owner_by_stem.entry(series_key(key)) {
            Entry::Vacant(slot) => {
                slot.insert(key);
            }
            Entry::Occupied(mut slot) => {
                let loser = if key < *slot.get() { slot.insert(key) } else { key };
                shadowed.insert(loser.to_string());
            }
        }
    }
    shadowed
}

/// Decode a series file
///
/// Missing files are `NotFound`. Bad gzip data and bad JSON are `Decode`; a
/// failure to read the bytes at all is `Io`.
pub fn load_file(path: &Path) -> Result<TimeSeries> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(HeraldError::not_found(format!("series {}", path.display())));
        }
        Err(e) => return Err(e.into()),
    };

    let mut json = Vec::new();
    GzDecoder::new(BufReader::new(file))
        .read_to_end(&mut json)
        .map_err(|e| match e.kind() {
            // what flate2 reports for malformed or truncated streams
            ErrorKind::InvalidInput | ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
                HeraldError::Decode(format!("{}: {}", path.display(), e))
            }
            _ => HeraldError::Io(e),
        })?;

    let mut series: TimeSeries = serde_json::from_slice(&json)
        .map_err(|e| HeraldError::Decode(format!("{}: {}", path.display(), e)))?;
    series.normalize();
    Ok(series)
}

/// Open a series file, treating a corrupt file like a missing one
///
/// I/O failures are returned so callers never mistake an unreadable file for
/// an empty one.
pub fn open_file(path: &Path) -> Result<Option<TimeSeries>> {
    match load_file(path) {
        Ok(series) => Ok(Some(series)),
        Err(HeraldError::NotFound { .. }) => Ok(None),
        Err(e @ HeraldError::Decode(_)) => {
            log::warn!("⚠️  {} seems to be corrupt, ignoring it: {}", path.display(), e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl TimeSeries {
    /// Replace the file at `path` with this series
    ///
    /// Not atomic: a concurrent reader may see a truncated file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, self)?;
        encoder.finish()?.flush()?;
        Ok(())
    }
}

/// Open or create the series at `path`, append, and persist if changed
///
/// Returns whether the file was rewritten. A file that cannot be read is left
/// alone and the error returned.
pub fn update_series(path: &Path, value: u64, timestamp: DateTime<Utc>) -> Result<bool> {
    let mut series = match open_file(path)? {
        Some(series) => series,
        None => {
            log::debug!("Creating new series: {}", path.display());
            TimeSeries::new()
        }
    };

    if !series.append(value, timestamp) {
        return Ok(false);
    }
    series.save(path)?;
    Ok(true)
}

/// All series files below one data directory
#[derive(Debug, Clone)]
pub struct SeriesStore {
    root: PathBuf,
}

impl SeriesStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, category: Category, metric: Metric, key: &str) -> PathBuf {
        series_path(&self.root, category.as_str(), metric.as_str(), key)
    }

    /// The series, or `None` when it was never written or is corrupt
    pub fn open(
        &self,
        category: Category,
        metric: Metric,
        key: &str,
    ) -> Result<Option<TimeSeries>> {
        open_file(&self.path(category, metric, key))
    }

    /// Read-side lookup: unknown series are `NotFound`
    pub fn history(&self, category: Category, metric: Metric, key: &str) -> Result<TimeSeries> {
        self.open(category, metric, key)?.ok_or_else(|| {
            HeraldError::not_found(format!(
                "{} {} series for {}",
                category.as_str(),
                metric.as_str(),
                key
            ))
        })
    }

    /// Growth of one counter since `since`, `NotFound` for unknown series
    pub fn value_since(
        &self,
        category: Category,
        metric: Metric,
        key: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        Ok(self.history(category, metric, key)?.value_since(since))
    }

    pub fn update(
        &self,
        category: Category,
        metric: Metric,
        key: &str,
        value: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        update_series(&self.path(category, metric, key), value, timestamp)
    }
}
