use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::sample::Sample;
use crate::schema;

/// Filesystem-backed, append-only store for price samples in Parquet format.
///
/// Directory layout: `{root}/data/{SYMBOL}/{YYYY}/{MM}/{YYYY-MM-DD}.parquet`,
/// one file per UTC day.
pub struct SampleStore {
    data_dir: PathBuf,
}

impl SampleStore {
    /// Create a store rooted at the given directory.
    /// The `data/` subdirectory is used automatically.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            data_dir: root.as_ref().join("data"),
        }
    }

    /// Path to the Parquet file for a given symbol and date.
    pub fn file_path(&self, symbol: &str, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(symbol)
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(format!("{}.parquet", date.format("%Y-%m-%d")))
    }

    pub fn has_data(&self, symbol: &str, date: NaiveDate) -> bool {
        self.file_path(symbol, date).exists()
    }

    /// Append one sample to the day file matching its UTC date.
    /// The day file is kept sorted by timestamp.
    pub fn append_sample(&self, symbol: &str, sample: &Sample) -> Result<(), StoreError> {
        if !sample.has_valid_price() {
            return Err(StoreError::InvalidPrice(sample.price));
        }

        let date = sample.timestamp.date_naive();
        let path = self.file_path(symbol, date);

        let mut samples = if path.exists() {
            schema::read_parquet(&path)?
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Vec::new()
        };

        samples.push(*sample);
        samples.sort_by_key(|s| s.timestamp);
        schema::write_parquet(&path, &samples)
    }

    /// Read all samples for a symbol on a specific date.
    pub fn read_day(&self, symbol: &str, date: NaiveDate) -> Result<Vec<Sample>, StoreError> {
        let path = self.file_path(symbol, date);
        if !path.exists() {
            return Err(StoreError::NoData {
                symbol: symbol.to_string(),
                date,
            });
        }
        schema::read_parquet(&path)
    }

    /// Samples with `start <= timestamp <= end`, sorted ascending.
    /// Days without a file are skipped.
    pub fn query_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError> {
        let first_day = start.date_naive();
        let last_day = end.date_naive();

        let mut all_samples = Vec::new();
        for date in self.list_dates(symbol)? {
            if date < first_day || date > last_day {
                continue;
            }
            let mut samples = schema::read_parquet(&self.file_path(symbol, date))?;
            all_samples.append(&mut samples);
        }

        all_samples.retain(|s| s.timestamp >= start && s.timestamp <= end);
        all_samples.sort_by_key(|s| s.timestamp);
        Ok(all_samples)
    }

    /// Every sample at or after `since`, sorted ascending.
    pub fn query_since(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError> {
        self.query_range(symbol, since, DateTime::<Utc>::MAX_UTC)
    }

    /// The most recent sample for a symbol, or None if nothing is stored.
    pub fn latest_sample(&self, symbol: &str) -> Result<Option<Sample>, StoreError> {
        for date in self.list_dates(symbol)?.into_iter().rev() {
            let samples = self.read_day(symbol, date)?;
            if let Some(last) = samples.into_iter().max_by_key(|s| s.timestamp) {
                return Ok(Some(last));
            }
        }
        Ok(None)
    }

    /// List all symbols that have data in the store.
    pub fn list_symbols(&self) -> Result<Vec<String>, StoreError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut symbols = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                symbols.push(name.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    /// List all dates with data for a given symbol, sorted ascending.
    pub fn list_dates(&self, symbol: &str) -> Result<Vec<NaiveDate>, StoreError> {
        let symbol_dir = self.data_dir.join(symbol);
        if !symbol_dir.exists() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();

        for year_entry in std::fs::read_dir(&symbol_dir)? {
            let year_entry = year_entry?;
            if !year_entry.file_type()?.is_dir() {
                continue;
            }

            for month_entry in std::fs::read_dir(year_entry.path())? {
                let month_entry = month_entry?;
                if !month_entry.file_type()?.is_dir() {
                    continue;
                }

                for file_entry in std::fs::read_dir(month_entry.path())? {
                    let file_entry = file_entry?;
                    let file_name = file_entry.file_name();
                    let name = file_name.to_string_lossy();
                    if let Some(date_str) = name.strip_suffix(".parquet")
                        && let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                    {
                        dates.push(date);
                    }
                }
            }
        }

        dates.sort();
        Ok(dates)
    }

    /// Get the date range (earliest, latest) for a symbol, or None if no data.
    pub fn date_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError> {
        let dates = self.list_dates(symbol)?;
        Ok(dates.first().copied().zip(dates.last().copied()))
    }
}
