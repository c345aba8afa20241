use crate::diagnostics::Diagnostics;
use crate::execution::fill::Fill;
use chrono::{DateTime, Utc};
use prettytable::{row, Table};
use serde::{Deserialize, Serialize};

/// One sample of the equity curve.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Terminal performance summary computed by [`crate::metrics::MetricsRecorder::finalize`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_return: f64,
    pub annualized_return: Option<f64>,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub win_rate: f64,
    pub profit_loss_ratio: f64,
    pub closed_trades: usize,
}

impl Stats {
    /// Prints the summary as a table, in the teacher's `prettytable` style.
    pub fn print(&self) {
        let mut table = Table::new();
        table.set_titles(row![
            "Total Return",
            "Annualized Return",
            "Max Drawdown",
            "Sharpe",
            "Win Rate",
            "P/L Ratio",
            "Closed Trades",
        ]);
        table.add_row(row![
            format!("{:.4}", self.total_return),
            self.annualized_return
                .map(|value| format!("{:.4}", value))
                .unwrap_or_else(|| "n/a".to_string()),
            format!("{:.4}", self.max_drawdown),
            format!("{:.4}", self.sharpe),
            format!("{:.4}", self.win_rate),
            format!("{:.4}", self.profit_loss_ratio),
            self.closed_trades.to_string(),
        ]);
        table.printstd();
    }
}

/// Full output of a backtest run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOutput {
    pub stats: Stats,
    pub equity_curve: Vec<EquityPoint>,
    pub fills: Vec<Fill>,
    pub benchmark_curve: Vec<EquityPoint>,
    pub diagnostics: Diagnostics,
}
