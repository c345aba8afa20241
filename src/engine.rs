use crate::config::Config;
use crate::context::BarContext;
use crate::data::bar::Bar;
use crate::data::feed::DataFeed;
use crate::diagnostics::Diagnostics;
use crate::error::BacktestError;
use crate::indicator::{IndicatorDef, IndicatorEngine};
use crate::metrics::stats::RunOutput;
use crate::metrics::MetricsRecorder;
use crate::portfolio::state::PortfolioState;
use crate::strategy::Strategy;
use indexmap::IndexMap;
use std::cell::RefCell;
use tracing::info;

/// Runs a single-threaded, deterministic backtest from start to finish.
///
/// `data` must already hold every symbol's bars, aligned onto the benchmark timeline via
/// [`crate::data::feed::DataFeedBuilder`]; `indicators` may hold definitions registered ahead of
/// time, but is not precomputed yet — that happens here, once, right after `strategy.on_start`
/// returns, so `on_start` can still call [`BarContext::register_indicator`]. `benchmark` is the
/// same bar series used to build `data`'s timeline, passed again so the terminal
/// [`MetricsRecorder::benchmark_curve`] can be computed.
///
/// One step per benchmark bar:
/// 1. [`DataFeed::advance`]
/// 2. roll settlement if the calendar day changed
/// 3. [`IndicatorEngine::set_cursor`]
/// 4. build the bar's [`BarContext`]
/// 5. `strategy.on_bar`
/// 6. [`crate::execution::engine::ExecutionEngine::drain_and_execute`]
/// 7. `strategy.on_trade` once per resulting fill
/// 8. [`MetricsRecorder::record_equity`]
pub fn run<S: Strategy>(
    strategy: &mut S,
    data: DataFeed,
    mut indicators: IndicatorEngine,
    benchmark: &[Bar],
    config: &Config,
) -> Result<RunOutput, BacktestError> {
    config.validate()?;

    let mut data = data.clip(config.start, config.end)?;
    let clipped_benchmark: Vec<Bar> = benchmark
        .iter()
        .filter(|bar| {
            config.start.map_or(true, |s| bar.timestamp >= s)
                && config.end.map_or(true, |e| bar.timestamp <= e)
        })
        .copied()
        .collect();

    let start_ts = data
        .benchmark_timeline()
        .get(0)
        .ok_or_else(|| BacktestError::Config("benchmark timeline is empty".into()))?;

    let mut portfolio = PortfolioState::new(config.cash, config.t0_symbols.clone());
    let execution = crate::execution::engine::ExecutionEngine::new();
    let mut metrics = MetricsRecorder::new(config.cash, start_ts);
    let mut scratch: IndexMap<String, serde_json::Value> = IndexMap::new();
    let pending_indicators: RefCell<Vec<(String, IndicatorDef)>> = RefCell::new(Vec::new());
    let mut diagnostics: Diagnostics = data.diagnostics().clone();

    {
        let mut ctx = BarContext::new(
            start_ts,
            &data,
            &indicators,
            &portfolio,
            &execution,
            IndexMap::new(),
            &mut scratch,
            &pending_indicators,
        );
        strategy
            .on_start(&mut ctx)
            .map_err(|message| BacktestError::Strategy {
                bar_index: 0,
                symbol: None,
                message,
            })?;
    }

    for (name, def) in pending_indicators.into_inner() {
        indicators.register(name, def)?;
    }
    indicators.precompute(&data)?;
    let pending_indicators: RefCell<Vec<(String, IndicatorDef)>> = RefCell::new(Vec::new());

    while data.advance() {
        let index = data.current_index().expect("advance just succeeded");
        let timestamp = data.current_timestamp().expect("advance just succeeded");
        let day = timestamp.date_naive();

        if portfolio.current_day() != Some(day) {
            portfolio.roll_day(day);
        }
        indicators.set_cursor(index);

        let current_bars = data.current_bars();
        let prices: IndexMap<String, f64> = current_bars
            .iter()
            .map(|(symbol, bar)| (symbol.clone(), bar.reference_price(config.execution_mode)))
            .collect();

        {
            let mut ctx = BarContext::new(
                timestamp,
                &data,
                &indicators,
                &portfolio,
                &execution,
                prices.clone(),
                &mut scratch,
                &pending_indicators,
            );
            strategy
                .on_bar(&mut ctx)
                .map_err(|message| BacktestError::Strategy {
                    bar_index: index,
                    symbol: None,
                    message,
                })?;
        }

        let fills = execution.drain_and_execute(
            &current_bars,
            &mut portfolio,
            config,
            day,
            &mut diagnostics,
        )?;

        if cfg!(debug_assertions) {
            portfolio.check_invariants()?;
        }

        for fill in &fills {
            metrics.record_fill(fill.clone());
            let mut ctx = BarContext::new(
                timestamp,
                &data,
                &indicators,
                &portfolio,
                &execution,
                prices.clone(),
                &mut scratch,
                &pending_indicators,
            );
            strategy
                .on_trade(&mut ctx, fill)
                .map_err(|message| BacktestError::Strategy {
                    bar_index: index,
                    symbol: Some(fill.symbol.clone()),
                    message,
                })?;
        }

        metrics.record_equity(timestamp, portfolio.equity_at(&prices));
    }

    let final_timestamp = data.current_timestamp().unwrap_or(start_ts);
    let final_prices: IndexMap<String, f64> = data
        .current_bars()
        .iter()
        .map(|(symbol, bar)| (symbol.clone(), bar.reference_price(config.execution_mode)))
        .collect();
    {
        let mut ctx = BarContext::new(
            final_timestamp,
            &data,
            &indicators,
            &portfolio,
            &execution,
            final_prices,
            &mut scratch,
            &pending_indicators,
        );
        strategy
            .on_stop(&mut ctx)
            .map_err(|message| BacktestError::Strategy {
                bar_index: data.current_index().unwrap_or(0),
                symbol: None,
                message,
            })?;
    }

    info!(bars = data.benchmark_timeline().len(), "backtest run complete");

    let annualization_scale = Some(252.0);
    let stats = metrics.finalize(annualization_scale)?;
    let equity_curve = metrics.equity_curve().to_vec();
    let fills = metrics.fills().to_vec();
    let benchmark_curve = metrics.benchmark_curve(&clipped_benchmark);

    Ok(RunOutput {
        stats,
        equity_curve,
        fills,
        benchmark_curve,
        diagnostics,
    })
}
