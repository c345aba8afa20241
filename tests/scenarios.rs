use ashare_backtest::config::Config;
use ashare_backtest::context::BarContext;
use ashare_backtest::data::bar::{Bar, Field};
use ashare_backtest::data::feed::DataFeed;
use ashare_backtest::engine;
use ashare_backtest::execution::order::QuantityType;
use ashare_backtest::indicator::builtin::BuiltinKind;
use ashare_backtest::indicator::{IndicatorDef, IndicatorEngine};
use ashare_backtest::strategy::Strategy;
use chrono::{DateTime, TimeZone, Utc};

fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

fn close_bar(day: u32, close: f64) -> Bar {
    Bar::builder()
        .timestamp(ts(day))
        .open(close)
        .high(close)
        .low(close)
        .close(close)
        .volume(10_000.0)
        .build()
        .unwrap()
}

/// Scenario 1: single-lot T+1 round trip.
///
/// Buy 100 shares @ 10.00 on day 1 (commission floored at 5.0), sell all 100 shares @ 11.00 on
/// day 2 once the T+1 roll makes them available. Expected terminal cash 96088.9, total_return
/// ~-0.039111.
struct RoundTrip;

impl Strategy for RoundTrip {
    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        match ctx.position("X") {
            None => ctx.order().buy("X", 100.0, QuantityType::Count),
            Some(position) if position.available > 0 => {
                ctx.order().sell("X", position.available as f64, QuantityType::Count)
            }
            _ => {}
        }
        Ok(())
    }
}

#[test]
fn single_lot_t1_round_trip_matches_spec_numbers() {
    let bars = vec![close_bar(1, 10.00), close_bar(2, 11.00)];
    let data = DataFeed::builder()
        .benchmark(bars.clone())
        .add_market_data("X", bars.clone())
        .build()
        .unwrap();

    let config = Config {
        cash: 100000.0,
        commission_rate: 0.0005,
        min_commission: 5.0,
        stamp_tax_rate: 0.001,
        slippage_bps: 0.0,
        ..Config::default()
    };

    let output = engine::run(&mut RoundTrip, data, IndicatorEngine::new(), &bars, &config).unwrap();

    assert_eq!(output.fills.len(), 2);
    let terminal_equity = output.equity_curve.last().unwrap().equity;
    assert!((terminal_equity - 96088.9).abs() < 1e-6);
    assert!((output.stats.total_return - (-0.039111)).abs() < 1e-6);
}

/// Scenario 3: weight rebalance. Starting flat with equity=100000 and X priced at 50,
/// `target({X: 0.3})` should convert to a lot-rounded buy of 600 shares (30000 / 50, floored to
/// a lot multiple — already exact here).
struct TargetThirtyPercent;

impl Strategy for TargetThirtyPercent {
    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        let mut weights = indexmap::IndexMap::new();
        weights.insert("X".to_string(), 0.3);
        ctx.order().target(&weights);
        Ok(())
    }
}

#[test]
fn weight_rebalance_buys_lot_rounded_target_shares() {
    let bars = vec![close_bar(1, 50.0)];
    let data = DataFeed::builder()
        .benchmark(bars.clone())
        .add_market_data("X", bars.clone())
        .build()
        .unwrap();

    let config = Config {
        cash: 100000.0,
        ..Config::default()
    };

    let output = engine::run(
        &mut TargetThirtyPercent,
        data,
        IndicatorEngine::new(),
        &bars,
        &config,
    )
    .unwrap();

    assert_eq!(output.fills.len(), 1);
    assert_eq!(output.fills[0].shares, 600);
}

/// Scenario: a suspended bar drops orders queued for that symbol this bar, with no fill and no
/// state change.
struct AlwaysBuy;

impl Strategy for AlwaysBuy {
    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        ctx.order().buy("X", 100.0, QuantityType::Count);
        Ok(())
    }
}

#[test]
fn suspended_bar_drops_queued_orders_for_that_symbol() {
    let benchmark = vec![close_bar(1, 10.0)];
    let mut suspended = close_bar(1, 10.0);
    suspended.suspended = true;

    let data = DataFeed::builder()
        .benchmark(benchmark.clone())
        .add_market_data("X", vec![suspended])
        .build()
        .unwrap();

    let config = Config::default();
    let output = engine::run(&mut AlwaysBuy, data, IndicatorEngine::new(), &benchmark, &config).unwrap();

    assert!(output.fills.is_empty());
    assert_eq!(output.equity_curve.last().unwrap().equity, config.cash);
}

/// Boundary behavior: an order sized under one lot is silently dropped, no fill.
struct BuySubLot;

impl Strategy for BuySubLot {
    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        ctx.order().buy("X", 50.0, QuantityType::Count);
        Ok(())
    }
}

#[test]
fn sub_lot_order_is_silently_dropped() {
    let bars = vec![close_bar(1, 10.0)];
    let data = DataFeed::builder()
        .benchmark(bars.clone())
        .add_market_data("X", bars.clone())
        .build()
        .unwrap();

    let config = Config::default();
    let output = engine::run(&mut BuySubLot, data, IndicatorEngine::new(), &bars, &config).unwrap();

    assert!(output.fills.is_empty());
}

/// Scenario 6: indicator future-leak guard. `sma(period=3, close)` over closes 1..=10; at
/// cursor=4 (the 5th bar), the scalar read returns (3+4+5)/3 = 4.0, and a 10-wide series read
/// returns only the 5 slots computable so far (oldest first), ending in that same value.
#[test]
fn indicator_read_never_sees_past_the_cursor() {
    let bars: Vec<Bar> = (1..=10).map(|day| close_bar(day, day as f64)).collect();
    let data = DataFeed::builder()
        .benchmark(bars.clone())
        .add_market_data("X", bars)
        .build()
        .unwrap();

    let mut indicators = IndicatorEngine::new();
    indicators
        .register(
            "sma3",
            IndicatorDef::Builtin(BuiltinKind::Sma { period: 3, field: Field::Close }),
        )
        .unwrap();
    indicators.precompute(&data).unwrap();
    indicators.set_cursor(4);

    assert_eq!(indicators.get("sma3", "X").unwrap(), Some(4.0));

    let series = indicators.get_series("sma3", "X", 10).unwrap();
    assert_eq!(series.len(), 5);
    assert_eq!(series, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
}

/// A strategy can register an indicator from `on_start` and read it back from `on_bar`, proving
/// registration is resolved (precompute runs) before the first bar, not before `on_start`.
struct RegistersSmaOnStart {
    observed: Vec<Option<f64>>,
}

impl Strategy for RegistersSmaOnStart {
    fn on_start(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        ctx.register_indicator(
            "sma3",
            IndicatorDef::Builtin(BuiltinKind::Sma { period: 3, field: Field::Close }),
        )
        .map_err(|error| error.to_string())
    }

    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        self.observed.push(ctx.indicator("sma3", "X").map_err(|error| error.to_string())?);
        Ok(())
    }
}

#[test]
fn strategy_can_register_indicator_from_on_start() {
    let bars: Vec<Bar> = (1..=5).map(|day| close_bar(day, day as f64)).collect();
    let data = DataFeed::builder()
        .benchmark(bars.clone())
        .add_market_data("X", bars.clone())
        .build()
        .unwrap();

    let mut strategy = RegistersSmaOnStart { observed: Vec::new() };
    let config = Config::default();
    engine::run(&mut strategy, data, IndicatorEngine::new(), &bars, &config).unwrap();

    assert_eq!(strategy.observed, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
}

/// `Config::start`/`end` clip the benchmark timeline before the run starts.
struct RecordTimestamps {
    seen: Vec<DateTime<Utc>>,
}

impl Strategy for RecordTimestamps {
    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        self.seen.push(ctx.timestamp());
        Ok(())
    }
}

#[test]
fn config_start_and_end_clip_the_run_to_the_given_window() {
    let bars = vec![close_bar(1, 10.0), close_bar(2, 11.0), close_bar(3, 12.0), close_bar(4, 13.0)];
    let data = DataFeed::builder()
        .benchmark(bars.clone())
        .add_market_data("X", bars.clone())
        .build()
        .unwrap();

    let config = Config {
        start: Some(ts(2)),
        end: Some(ts(3)),
        ..Config::default()
    };

    let mut strategy = RecordTimestamps { seen: Vec::new() };
    let output = engine::run(&mut strategy, data, IndicatorEngine::new(), &bars, &config).unwrap();

    assert_eq!(strategy.seen, vec![ts(2), ts(3)]);
    assert_eq!(output.benchmark_curve.len(), 2);
}

/// Orders that get dropped or downsized during execution are both logged and collected into
/// `RunOutput::diagnostics`.
#[test]
fn dropped_orders_are_collected_into_diagnostics() {
    let bars = vec![close_bar(1, 10.0)];
    let data = DataFeed::builder()
        .benchmark(bars.clone())
        .add_market_data("X", bars.clone())
        .build()
        .unwrap();

    let config = Config::default();
    let output = engine::run(&mut BuySubLotForDiagnostics, data, IndicatorEngine::new(), &bars, &config).unwrap();

    assert!(output.fills.is_empty());
    assert_eq!(output.diagnostics.len(), 1);
}

struct BuySubLotForDiagnostics;

impl Strategy for BuySubLotForDiagnostics {
    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        ctx.order().buy("X", 50.0, QuantityType::Count);
        Ok(())
    }
}
