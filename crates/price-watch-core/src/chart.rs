//! Quantization of a price series and its moving average onto a fixed grid.
//!
//! The grid only carries cell categories. Turning categories into glyphs and
//! colors is left to the presentation layer.

use crate::error::ChartError;

/// What occupies a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Price,
    Average,
    /// Price and average quantize to the same row.
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartGrid {
    /// `rows[y][x]`, with `y = 0` the bottom row.
    rows: Vec<Vec<Cell>>,
    price_levels: Vec<i64>,
    average_levels: Vec<i64>,
    /// Lowest downsampled price (bottom of the scale).
    pub min: f64,
    /// Highest downsampled price (top of the scale).
    pub max: f64,
}

impl ChartGrid {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of plotted columns, at most the requested width.
    pub fn width(&self) -> usize {
        self.price_levels.len()
    }

    /// Category at row `y` (0 = bottom) and column `x`.
    pub fn cell(&self, y: usize, x: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Rows from top (highest values) to bottom, ready for printing.
    pub fn rows_top_down(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().rev().map(|row| row.as_slice())
    }

    /// Quantized row of each plotted price, always within `0..height`.
    pub fn price_levels(&self) -> &[i64] {
        &self.price_levels
    }

    /// Quantized row of each plotted average. Values outside the price
    /// range fall outside `0..height` and are not drawn.
    pub fn average_levels(&self) -> &[i64] {
        &self.average_levels
    }
}

/// Indices picked when fitting `len` points into `width` columns.
///
/// Short series keep every point. Longer ones take every
/// `floor(len / width)`-th point from index 0, capped at `width` points.
pub fn downsample_indices(len: usize, width: usize) -> Vec<usize> {
    let step = if len > width && width > 0 { len / width } else { 1 };
    (0..len).step_by(step).take(width).collect()
}

fn level(value: f64, min: f64, max: f64, height: usize) -> i64 {
    let normalized = if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    };
    (normalized * (height - 1) as f64).floor() as i64
}

/// Quantize `prices` and the aligned `averages` into a `height`-row grid
/// of at most `width` columns.
///
/// The vertical scale spans the min and max of the downsampled prices; the
/// averages share that scale without widening it. A flat price series maps
/// every point to row 0.
pub fn render(
    prices: &[f64],
    averages: &[f64],
    width: usize,
    height: usize,
) -> Result<ChartGrid, ChartError> {
    if width == 0 || height == 0 {
        return Err(ChartError::ZeroDimension { width, height });
    }
    if prices.len() != averages.len() {
        return Err(ChartError::LengthMismatch {
            prices: prices.len(),
            averages: averages.len(),
        });
    }
    if prices.is_empty() {
        return Err(ChartError::EmptySeries);
    }

    let indices = downsample_indices(prices.len(), width);
    let price_points: Vec<f64> = indices.iter().map(|&i| prices[i]).collect();
    let average_points: Vec<f64> = indices.iter().map(|&i| averages[i]).collect();

    let min = price_points.iter().copied().fold(f64::INFINITY, f64::min);
    let max = price_points.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let price_levels: Vec<i64> = price_points
        .iter()
        .map(|&p| level(p, min, max, height))
        .collect();
    let average_levels: Vec<i64> = average_points
        .iter()
        .map(|&a| level(a, min, max, height))
        .collect();

    let rows: Vec<Vec<Cell>> = (0..height as i64)
        .map(|y| {
            price_levels
                .iter()
                .zip(&average_levels)
                .map(|(&p, &a)| match (p == y, a == y) {
                    (true, true) => Cell::Both,
                    (true, false) => Cell::Price,
                    (false, true) => Cell::Average,
                    (false, false) => Cell::Empty,
                })
                .collect()
        })
        .collect();

    Ok(ChartGrid {
        rows,
        price_levels,
        average_levels,
        min,
        max,
    })
}
