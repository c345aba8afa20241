/// Errors generated in the metrics module.
pub mod error;

/// One-pass (Welford) variance/stdev recurrence, reused for per-bar return dispersion.
pub mod algorithm;

/// [`stats::Stats`], [`stats::EquityPoint`] and [`stats::RunOutput`].
pub mod stats;

use crate::data::bar::Bar;
use crate::execution::fill::Fill;
use crate::execution::order::Side;
use crate::metrics::algorithm::WelfordOnline;
use crate::metrics::error::MetricsError;
use crate::metrics::stats::{EquityPoint, Stats};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::VecDeque;

/// Appends the equity curve and fill log over the course of a run, and computes the terminal
/// [`Stats`] summary once the main loop finishes.
pub struct MetricsRecorder {
    initial_cash: f64,
    equity_curve: Vec<EquityPoint>,
    fills: Vec<Fill>,
}

impl MetricsRecorder {
    /// `start` is the timestamp of the benchmark's first bar; it seeds `E_0 = initial_cash`.
    pub fn new(initial_cash: f64, start: DateTime<Utc>) -> Self {
        Self {
            initial_cash,
            equity_curve: vec![EquityPoint {
                timestamp: start,
                equity: initial_cash,
            }],
            fills: Vec::new(),
        }
    }

    pub fn record_equity(&mut self, timestamp: DateTime<Utc>, equity: f64) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    pub fn record_fill(&mut self, fill: Fill) {
        self.fills.push(fill);
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Buy-and-hold of `benchmark_bars`, scaled to the run's initial cash.
    pub fn benchmark_curve(&self, benchmark_bars: &[Bar]) -> Vec<EquityPoint> {
        let Some(first) = benchmark_bars.first() else {
            return Vec::new();
        };
        if first.close <= 0.0 {
            return Vec::new();
        }
        let units = self.initial_cash / first.close;
        benchmark_bars
            .iter()
            .map(|bar| EquityPoint {
                timestamp: bar.timestamp,
                equity: units * bar.close,
            })
            .collect()
    }

    /// Computes the terminal [`Stats`] summary. `annualization_scale` is the number of bars per
    /// year (e.g. `252.0` for daily bars); pass `None` when the bar period is unknown, in which
    /// case `annualized_return` is left unavailable.
    pub fn finalize(&self, annualization_scale: Option<f64>) -> Result<Stats, MetricsError> {
        if self.equity_curve.is_empty() {
            return Err(MetricsError::EmptyEquityCurve);
        }

        let values: Vec<f64> = self.equity_curve.iter().map(|point| point.equity).collect();
        let e0 = values[0];
        let et = *values.last().unwrap();

        let total_return = if e0 > 0.0 { et / e0 - 1.0 } else { 0.0 };

        let n_bars = (values.len() - 1) as f64;
        let annualized_return = match annualization_scale {
            Some(scale) if n_bars > 0.0 && e0 > 0.0 => {
                Some((et / e0).powf(scale / n_bars) - 1.0)
            }
            _ => None,
        };

        let max_drawdown = max_drawdown(&values);

        let returns: Vec<f64> = values
            .windows(2)
            .filter(|pair| pair[0] > 0.0)
            .map(|pair| pair[1] / pair[0] - 1.0)
            .collect();
        let sharpe = sharpe_ratio(&returns, annualization_scale.unwrap_or(252.0));

        let (win_rate, profit_loss_ratio, closed_trades) = closed_trade_stats(&self.fills);

        Ok(Stats {
            total_return,
            annualized_return,
            max_drawdown,
            sharpe,
            win_rate,
            profit_loss_ratio,
            closed_trades,
        })
    }
}

fn max_drawdown(curve: &[f64]) -> f64 {
    let mut peak = curve[0];
    let mut worst = 0.0f64;
    for &equity in curve {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

fn sharpe_ratio(returns: &[f64], annualization_scale: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let mut mean = 0.0;
    let mut m = 0.0;
    for (i, &r) in returns.iter().enumerate() {
        let count = (i + 1) as f64;
        let new_mean = mean + (r - mean) / count;
        m = WelfordOnline::calculate_recurrence_relation_m(m, mean, r, new_mean);
        mean = new_mean;
    }
    let variance = WelfordOnline::calculate_sample_variance(m, returns.len() as f64);
    let stdev = variance.sqrt();

    if stdev == 0.0 {
        0.0
    } else {
        (mean / stdev) * annualization_scale.sqrt()
    }
}

struct OpenLot {
    shares: u64,
    price: f64,
    commission_per_share: f64,
}

/// FIFO-pairs buy and sell fills per symbol into closed trades and derives `win_rate` and
/// `profit_loss_ratio` from their realized P/L.
fn closed_trade_stats(fills: &[Fill]) -> (f64, f64, usize) {
    let mut open: IndexMap<String, VecDeque<OpenLot>> = IndexMap::new();
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut closed = 0usize;

    for fill in fills {
        if fill.shares == 0 {
            continue;
        }
        match fill.side {
            Side::Buy => {
                let commission_per_share = fill.commission / fill.shares as f64;
                open.entry(fill.symbol.clone()).or_default().push_back(OpenLot {
                    shares: fill.shares,
                    price: fill.price,
                    commission_per_share,
                });
            }
            Side::Sell => {
                let sell_fee_per_share = (fill.commission + fill.stamp_tax) / fill.shares as f64;
                let mut remaining = fill.shares;
                let Some(queue) = open.get_mut(&fill.symbol) else {
                    continue;
                };
                while remaining > 0 {
                    let Some(lot) = queue.front_mut() else {
                        break;
                    };
                    let matched = remaining.min(lot.shares);
                    let pnl = matched as f64 * (fill.price - lot.price)
                        - matched as f64 * (lot.commission_per_share + sell_fee_per_share);

                    if pnl >= 0.0 {
                        wins += 1;
                        gross_profit += pnl;
                    } else {
                        losses += 1;
                        gross_loss += -pnl;
                    }
                    closed += 1;

                    lot.shares -= matched;
                    remaining -= matched;
                    if lot.shares == 0 {
                        queue.pop_front();
                    }
                }
            }
        }
    }

    let win_rate = if closed > 0 {
        wins as f64 / closed as f64
    } else {
        0.0
    };

    let avg_win = if wins > 0 { gross_profit / wins as f64 } else { 0.0 };
    let avg_loss = if losses > 0 { gross_loss / losses as f64 } else { 0.0 };
    let profit_loss_ratio = if avg_loss > 0.0 {
        avg_win / avg_loss
    } else if avg_win > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    (win_rate, profit_loss_ratio, closed)
}
