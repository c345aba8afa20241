use crate::data::bar::Field;
use serde::{Deserialize, Serialize};
use ta::indicators::{ExponentialMovingAverage, RelativeStrengthIndex, SimpleMovingAverage};
use ta::Next;

/// Tag + parameters identifying a builtin indicator kind. Dispatched on in
/// [`BuiltinState::new`]/[`BuiltinState::feed`].
#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
pub enum BuiltinKind {
    Sma { period: usize, field: Field },
    Ema { period: usize, field: Field },
    Rsi { period: usize, field: Field },
}

impl BuiltinKind {
    pub fn field(&self) -> Field {
        match self {
            BuiltinKind::Sma { field, .. } => *field,
            BuiltinKind::Ema { field, .. } => *field,
            BuiltinKind::Rsi { field, .. } => *field,
        }
    }

    pub fn lookback(&self) -> usize {
        match self {
            BuiltinKind::Sma { period, .. } => *period,
            BuiltinKind::Ema { period, .. } => *period,
            BuiltinKind::Rsi { period, .. } => *period,
        }
    }
}

/// Wraps a `ta` crate incremental indicator with the missing-value bookkeeping this engine
/// needs: `ta`'s own indicators happily report an average over a partial window, but this
/// engine's contract is "missing until `period` present values have been seen".
enum Inner {
    Sma(SimpleMovingAverage),
    Ema(ExponentialMovingAverage),
    Rsi(RelativeStrengthIndex),
}

pub struct BuiltinState {
    inner: Inner,
    period: usize,
    seen: usize,
}

impl BuiltinState {
    pub fn new(kind: BuiltinKind) -> Self {
        let (inner, period) = match kind {
            BuiltinKind::Sma { period, .. } => (
                Inner::Sma(SimpleMovingAverage::new(period).expect("period >= 1")),
                period,
            ),
            BuiltinKind::Ema { period, .. } => (
                Inner::Ema(ExponentialMovingAverage::new(period).expect("period >= 1")),
                period,
            ),
            BuiltinKind::Rsi { period, .. } => (
                Inner::Rsi(RelativeStrengthIndex::new(period).expect("period >= 1")),
                period,
            ),
        };
        Self {
            inner,
            period,
            seen: 0,
        }
    }

    /// Feeds one present field value and returns the indicator's value, or `None` if fewer than
    /// `period` present values have been seen yet.
    pub fn feed(&mut self, value: f64) -> Option<f64> {
        let next = match &mut self.inner {
            Inner::Sma(sma) => sma.next(value),
            Inner::Ema(ema) => ema.next(value),
            Inner::Rsi(rsi) => rsi.next(value),
        };
        self.seen += 1;
        if self.seen >= self.period {
            Some(next)
        } else {
            None
        }
    }
}
