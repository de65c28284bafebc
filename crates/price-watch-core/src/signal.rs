use std::fmt;

use serde::{Deserialize, Serialize};

pub const SELL_RECOMMENDATION: &str = "** SELL **";
pub const BUY_RECOMMENDATION: &str = "** BUY **";

/// Discrete trading action derived from price vs. moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Banner text shown next to the price line. Empty for `Hold`.
    pub fn recommendation(&self) -> &'static str {
        match self {
            Action::Buy => BUY_RECOMMENDATION,
            Action::Sell => SELL_RECOMMENDATION,
            Action::Hold => "",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

/// A previously recorded purchase, used to estimate the outcome of selling now.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub amount: f64,
    pub buy_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitEstimate {
    pub amount: f64,
    pub buy_value: f64,
    pub fee: f64,
    pub sell_value: f64,
    pub profit: f64,
}

impl Holding {
    /// Value of selling the whole holding at `current_price`, net of a
    /// percentage fee charged on the original buy value.
    pub fn estimate(&self, current_price: f64, fee_pct: f64) -> ProfitEstimate {
        let buy_value = self.amount * self.buy_price;
        let fee = buy_value * fee_pct / 100.0;
        let sell_value = self.amount * current_price - fee;
        ProfitEstimate {
            amount: self.amount,
            buy_value,
            fee,
            sell_value,
            profit: sell_value - buy_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: Action,
    pub current_price: f64,
    pub moving_average: f64,
    pub percent_change: f64,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub profit: Option<ProfitEstimate>,
}

impl Signal {
    fn hold_without_average(current_price: f64) -> Self {
        Self {
            action: Action::Hold,
            current_price,
            moving_average: 0.0,
            percent_change: 0.0,
            recommendation: String::new(),
            profit: None,
        }
    }

    /// Attach a profit estimate for `holding`. Only SELL signals carry one.
    pub fn with_holding(mut self, holding: &Holding, fee_pct: f64) -> Self {
        if self.action == Action::Sell {
            self.profit = Some(holding.estimate(self.current_price, fee_pct));
        }
        self
    }
}

/// Classify `current_price` against `moving_average`.
///
/// A missing or zero average yields HOLD with a percent change of 0.
/// Otherwise the percent change is compared to `change_threshold_pct` with
/// strict inequalities: above `T` sells, below `-T` buys, anything else holds.
pub fn classify(
    current_price: f64,
    moving_average: Option<f64>,
    change_threshold_pct: f64,
) -> Signal {
    let moving_average = match moving_average {
        Some(avg) if avg != 0.0 => avg,
        _ => return Signal::hold_without_average(current_price),
    };

    let percent_change = (current_price - moving_average) / moving_average * 100.0;

    let action = if percent_change > change_threshold_pct {
        Action::Sell
    } else if percent_change < -change_threshold_pct {
        Action::Buy
    } else {
        Action::Hold
    };

    Signal {
        action,
        current_price,
        moving_average,
        percent_change,
        recommendation: action.recommendation().to_string(),
        profit: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sell_above_threshold() {
        let signal = classify(130.0, Some(107.5), 10.0);
        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.recommendation, "** SELL **");
        assert!((signal.percent_change - 20.930232558).abs() < 1e-6);
        assert_eq!(signal.moving_average, 107.5);
        assert_eq!(signal.current_price, 130.0);
    }

    #[test]
    fn buy_below_negative_threshold() {
        let signal = classify(80.0, Some(100.0), 10.0);
        assert_eq!(signal.action, Action::Buy);
        assert_eq!(signal.recommendation, "** BUY **");
        assert!((signal.percent_change + 20.0).abs() < 1e-9);
    }

    #[test]
    fn hold_inside_band() {
        let signal = classify(105.0, Some(100.0), 10.0);
        assert_eq!(signal.action, Action::Hold);
        assert!(signal.recommendation.is_empty());
        assert!((signal.percent_change - 5.0).abs() < 1e-9);
    }

    #[test]
    fn exactly_at_threshold_holds() {
        // 150 vs 100 is exactly +50%, representable without rounding
        assert_eq!(classify(150.0, Some(100.0), 50.0).action, Action::Hold);
        assert_eq!(classify(50.0, Some(100.0), 50.0).action, Action::Hold);
    }

    #[test]
    fn zero_threshold_has_no_hold_band() {
        assert_eq!(classify(100.01, Some(100.0), 0.0).action, Action::Sell);
        assert_eq!(classify(99.99, Some(100.0), 0.0).action, Action::Buy);
        assert_eq!(classify(100.0, Some(100.0), 0.0).action, Action::Hold);
    }

    #[test]
    fn missing_average_holds() {
        let signal = classify(130.0, None, 10.0);
        assert_eq!(signal.action, Action::Hold);
        assert_eq!(signal.percent_change, 0.0);
        assert_eq!(signal.moving_average, 0.0);
        assert!(signal.recommendation.is_empty());
    }

    #[test]
    fn zero_average_holds() {
        let signal = classify(130.0, Some(0.0), 10.0);
        assert_eq!(signal.action, Action::Hold);
        assert_eq!(signal.percent_change, 0.0);
        assert_eq!(signal.moving_average, 0.0);
        assert!(signal.percent_change.is_finite());
    }

    #[test]
    fn profit_estimate_math() {
        let holding = Holding {
            amount: 0.5,
            buy_price: 100_000.0,
        };
        let estimate = holding.estimate(120_000.0, 0.4);
        assert_eq!(estimate.buy_value, 50_000.0);
        assert!((estimate.fee - 200.0).abs() < 1e-9);
        assert!((estimate.sell_value - 59_800.0).abs() < 1e-9);
        assert!((estimate.profit - 9_800.0).abs() < 1e-9);
    }

    #[test]
    fn holding_attached_only_on_sell() {
        let holding = Holding {
            amount: 1.0,
            buy_price: 100.0,
        };

        let sell = classify(130.0, Some(100.0), 10.0).with_holding(&holding, 1.0);
        let profit = sell.profit.unwrap();
        assert!((profit.profit - 29.0).abs() < 1e-9);
        assert_eq!(sell.action, Action::Sell);

        let hold = classify(101.0, Some(100.0), 10.0).with_holding(&holding, 1.0);
        assert!(hold.profit.is_none());
        assert_eq!(hold.action, Action::Hold);
    }

    #[test]
    fn action_display() {
        assert_eq!(Action::Buy.to_string(), "BUY");
        assert_eq!(Action::Sell.to_string(), "SELL");
        assert_eq!(Action::Hold.to_string(), "HOLD");
    }

    #[test]
    fn signal_serializes_action_uppercase() {
        let signal = classify(80.0, Some(100.0), 10.0);
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["action"], "BUY");
        assert!(json.get("profit").is_none());
    }
}
