use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use crossterm::style::Stylize;
use price_watch_core::chart::{Cell, ChartGrid};
use price_watch_core::signal::{ProfitEstimate, Signal};

const RULE_WIDTH: usize = 105;
const RULE: &str = "\u{2500}";
const DOT: &str = "\u{2022}";

pub fn rule() -> String {
    RULE.repeat(RULE_WIDTH)
}

/// Fixed-point text with comma thousands separators, e.g. `116,438.81`.
pub fn grouped(value: f64, decimals: usize) -> String {
    let text = format!("{value:.decimals$}");
    if !value.is_finite() {
        return text;
    }

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3);
    out.push_str(sign);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Wall-clock time in US Eastern, e.g. `2025-07-14 10:30:00 EDT`.
pub fn eastern_time(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&New_York)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

pub fn price_line(
    timestamp: &DateTime<Utc>,
    symbol: &str,
    signal: &Signal,
    ma_days: u32,
) -> String {
    let line = format!(
        "{} - {} ${}, {}d avg ${}, diff {}%",
        eastern_time(timestamp),
        symbol,
        grouped(signal.current_price, 2),
        ma_days,
        grouped(signal.moving_average, 2),
        grouped(signal.percent_change, 2),
    );
    if signal.recommendation.is_empty() {
        line
    } else {
        format!("{line} {}", signal.recommendation)
    }
}

pub fn profit_line(estimate: &ProfitEstimate) -> String {
    format!(
        "Amount {}, Buy Value: ${}, Transaction Fee: ${}, Sell Value: ${}, Profit: ${}",
        grouped(estimate.amount, 10),
        grouped(estimate.buy_value, 4),
        grouped(estimate.fee, 4),
        grouped(estimate.sell_value, 4),
        grouped(estimate.profit, 6),
    )
}

pub fn legend(ma_days: u32) -> String {
    format!(
        "Price: {} {ma_days}d MA: {} Both: {}",
        DOT.grey(),
        DOT.dark_green(),
        DOT.dark_yellow()
    )
}

// Standard (non-bright) white, green and yellow.
fn glyph(cell: Cell) -> String {
    match cell {
        Cell::Empty => " ".to_string(),
        Cell::Price => DOT.grey().to_string(),
        Cell::Average => RULE.dark_green().to_string(),
        Cell::Both => DOT.dark_yellow().to_string(),
    }
}

/// One string per grid row, top row first.
pub fn chart_lines(grid: &ChartGrid) -> Vec<String> {
    grid.rows_top_down()
        .map(|row| row.iter().map(|&cell| glyph(cell)).collect::<String>())
        .collect()
}

pub fn bounds_line(grid: &ChartGrid) -> String {
    format!("High ${}  Low ${}", grouped(grid.max, 2), grouped(grid.min, 2))
}

/// Full text block for one evaluation: price line, optional profit line,
/// legend and chart.
pub fn report(
    timestamp: &DateTime<Utc>,
    symbol: &str,
    signal: &Signal,
    grid: Option<&ChartGrid>,
    ma_days: u32,
) -> String {
    let mut lines = vec![rule(), price_line(timestamp, symbol, signal, ma_days)];
    if let Some(estimate) = &signal.profit {
        lines.push(profit_line(estimate));
    }
    lines.push(rule());
    lines.push(legend(ma_days));

    if let Some(grid) = grid {
        lines.extend(chart_lines(grid));
        lines.push(bounds_line(grid));
    }

    lines.push(rule());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use price_watch_core::chart;
    use price_watch_core::signal::{Holding, classify};

    fn july() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 14, 30, 0).unwrap()
    }

    #[test]
    fn eastern_time_handles_dst() {
        assert_eq!(eastern_time(&july()), "2025-07-14 10:30:00 EDT");
        let january = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();
        assert_eq!(eastern_time(&january), "2025-01-15 09:30:00 EST");
    }

    #[test]
    fn price_line_with_recommendation() {
        let signal = classify(130.0, Some(107.5), 10.0);
        let line = price_line(&july(), "BTC", &signal, 1);
        assert_eq!(
            line,
            "2025-07-14 10:30:00 EDT - BTC $130.00, 1d avg $107.50, diff 20.93% ** SELL **"
        );
    }

    #[test]
    fn price_line_hold_has_no_banner() {
        let signal = classify(101.0, Some(100.0), 10.0);
        let line = price_line(&july(), "ETH", &signal, 3);
        assert!(line.ends_with("3d avg $100.00, diff 1.00%"));
    }

    #[test]
    fn profit_line_format() {
        let estimate = Holding {
            amount: 0.5,
            buy_price: 100.0,
        }
        .estimate(120.0, 0.0);
        assert_eq!(
            profit_line(&estimate),
            "Amount 0.5000000000, Buy Value: $50.0000, Transaction Fee: $0.0000, Sell Value: $60.0000, Profit: $10.000000"
        );
    }

    #[test]
    fn chart_lines_map_cells_to_glyphs() {
        let grid = chart::render(&[1.0, 2.0], &[1.0, 1.0], 2, 2).unwrap();
        let lines = chart_lines(&grid);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!(" {}", DOT.grey()));
        assert_eq!(
            lines[1],
            format!("{}{}", DOT.dark_yellow(), RULE.dark_green())
        );
        assert!(lines[1].contains(DOT));
        assert!(lines[1].contains(RULE));
    }

    #[test]
    fn legend_names_each_series() {
        let text = legend(3);
        assert!(text.starts_with("Price: "));
        assert!(text.contains(&format!("3d MA: {}", DOT.dark_green())));
        assert!(text.ends_with(&format!("Both: {}", DOT.dark_yellow())));
    }

    #[test]
    fn grouped_inserts_thousands_separators() {
        assert_eq!(grouped(116_438.805_1, 2), "116,438.81");
        assert_eq!(grouped(1_234_567.0, 0), "1,234,567");
        assert_eq!(grouped(999.5, 2), "999.50");
        assert_eq!(grouped(-12_345.678, 1), "-12,345.7");
        assert_eq!(grouped(0.25, 10), "0.2500000000");
    }

    #[test]
    fn price_line_groups_large_prices() {
        let signal = classify(116_438.81, Some(115_000.0), 10.0);
        let line = price_line(&july(), "BTC", &signal, 1);
        assert!(line.contains("BTC $116,438.81, 1d avg $115,000.00, diff 1.25%"));
    }

    #[test]
    fn report_includes_profit_only_when_present() {
        let holding = Holding {
            amount: 1.0,
            buy_price: 100.0,
        };
        let sell = classify(130.0, Some(100.0), 10.0).with_holding(&holding, 0.0);
        let text = report(&july(), "BTC", &sell, None, 1);
        assert!(text.contains("Profit: $30.000000"));

        let hold = classify(100.0, Some(100.0), 10.0).with_holding(&holding, 0.0);
        let text = report(&july(), "BTC", &hold, None, 1);
        assert!(!text.contains("Profit"));
    }

    #[test]
    fn report_appends_chart_and_bounds() {
        let signal = classify(30.0, Some(20.0), 10.0);
        let grid = chart::render(&[10.0, 20.0, 30.0], &[10.0, 20.0, 30.0], 3, 3).unwrap();
        let text = report(&july(), "BTC", &signal, Some(&grid), 1);
        assert!(text.contains("High $30.00  Low $10.00"));
        // rule, price, rule, legend, 3 chart rows, bounds, rule
        assert_eq!(text.lines().count(), 9);
    }
}
