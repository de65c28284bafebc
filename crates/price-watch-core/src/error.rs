use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("No data found for {symbol} on {date}")]
    NoData {
        symbol: String,
        date: chrono::NaiveDate,
    },

    #[error("Invalid price {0}: must be finite and greater than zero")]
    InvalidPrice(f64),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("chart dimensions must be positive, got {width}x{height}")]
    ZeroDimension { width: usize, height: usize },

    #[error("price series has {prices} points but average series has {averages}")]
    LengthMismatch { prices: usize, averages: usize },

    #[error("no points to plot")]
    EmptySeries,
}
