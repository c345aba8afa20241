/// Errors generated in the indicator module.
pub mod error;

/// `ta`-crate-backed builtin indicators (SMA, EMA, RSI).
pub mod builtin;

use crate::data::bar::Bar;
use crate::data::feed::DataFeed;
use crate::indicator::builtin::{BuiltinKind, BuiltinState};
use crate::indicator::error::IndicatorError;
use indexmap::IndexMap;
use std::sync::Arc;

/// A user-supplied indicator function: given the historical window of present bars (oldest
/// first, current last, length at most `lookback`), returns the indicator value or `None`.
pub type UserCallable = Arc<dyn Fn(&[Bar]) -> Option<f64> + Send + Sync>;

/// Tagged definition of a registered indicator: either a `ta`-backed builtin, or a user-supplied
/// callable with a declared lookback window.
#[derive(Clone)]
pub enum IndicatorDef {
    Builtin(BuiltinKind),
    UserCallable { callable: UserCallable, lookback: usize },
}

impl IndicatorDef {
    fn lookback(&self) -> usize {
        match self {
            IndicatorDef::Builtin(kind) => kind.lookback(),
            IndicatorDef::UserCallable { lookback, .. } => *lookback,
        }
    }
}

/// Precomputes every registered indicator's value at every benchmark index, for every symbol
/// with an aligned bar, then serves historical-only reads through a cursor that rejects any
/// read past the current benchmark index.
pub struct IndicatorEngine {
    defs: IndexMap<String, IndicatorDef>,
    // (indicator name, symbol) -> dense series, one slot per benchmark index
    series: IndexMap<(String, String), Vec<Option<f64>>>,
    cursor: Option<usize>,
    precomputed: bool,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self {
            defs: IndexMap::new(),
            series: IndexMap::new(),
            cursor: None,
            precomputed: false,
        }
    }

    /// Registers an indicator definition. Must be called before [`IndicatorEngine::precompute`].
    pub fn register(
        &mut self,
        name: impl Into<String>,
        def: IndicatorDef,
    ) -> Result<(), IndicatorError> {
        let name = name.into();
        if self.defs.contains_key(&name) {
            return Err(IndicatorError::DuplicateName(name));
        }
        self.defs.insert(name, def);
        Ok(())
    }

    /// Computes every registered indicator's value at every benchmark index for every symbol
    /// with an aligned bar. Must be called exactly once, after every [`IndicatorEngine::register`]
    /// call and before the main loop begins advancing the cursor.
    pub fn precompute(&mut self, feed: &DataFeed) -> Result<(), IndicatorError> {
        if self.precomputed {
            return Err(IndicatorError::AlreadyPrecomputed);
        }

        let symbols: Vec<String> = feed.symbols().map(String::from).collect();
        for (name, def) in &self.defs {
            for symbol in &symbols {
                let aligned_bars = feed
                    .aligned_series(symbol)
                    .expect("symbol came from feed.symbols()");
                let values = precompute_one(def, aligned_bars);
                self.series.insert((name.clone(), symbol.clone()), values);
            }
        }

        self.precomputed = true;
        Ok(())
    }

    /// Whether [`IndicatorEngine::precompute`] has already run.
    pub fn is_precomputed(&self) -> bool {
        self.precomputed
    }

    /// Advances the read cursor; called by the main loop before each bar's strategy callback.
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = Some(index);
    }

    /// The most recent value for `name`/`symbol`, as of the current cursor.
    pub fn get(&self, name: &str, symbol: &str) -> Result<Option<f64>, IndicatorError> {
        Ok(self.get_series(name, symbol, 1)?.into_iter().next().flatten())
    }

    /// Up to `count` most recent values for `name`/`symbol`, oldest first, ending at the current
    /// cursor. Never reads past the cursor.
    pub fn get_series(
        &self,
        name: &str,
        symbol: &str,
        count: usize,
    ) -> Result<Vec<Option<f64>>, IndicatorError> {
        let cursor = self.cursor.ok_or(IndicatorError::NotPrecomputed)?;
        let series = self
            .series
            .get(&(name.to_string(), symbol.to_string()))
            .ok_or_else(|| IndicatorError::UnknownIndicator(name.to_string()))?;

        let start = cursor.saturating_sub(count.saturating_sub(1));
        Ok(series[start..=cursor].to_vec())
    }
}

fn precompute_one(def: &IndicatorDef, aligned_bars: &[Option<Bar>]) -> Vec<Option<f64>> {
    match def {
        IndicatorDef::Builtin(kind) => {
            let mut state = BuiltinState::new(*kind);
            let field = kind.field();
            aligned_bars
                .iter()
                .map(|slot| slot.map(|bar| state.feed(bar.field(field))).flatten())
                .collect()
        }
        IndicatorDef::UserCallable { callable, lookback } => {
            let mut out = Vec::with_capacity(aligned_bars.len());
            let mut present: Vec<Bar> = Vec::new();
            for slot in aligned_bars {
                if let Some(bar) = slot {
                    present.push(*bar);
                    let window_start = present.len().saturating_sub(*lookback);
                    out.push(callable(&present[window_start..]));
                } else {
                    out.push(None);
                }
            }
            out
        }
    }
}
