use crate::data::bar::Bar;
use crate::data::error::DataError;
use crate::data::timeline::BenchmarkTimeline;
use crate::diagnostics::{Diagnostics, Warning};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::warn;

/// A symbol's bars aligned onto the [`BenchmarkTimeline`]; `None` where the symbol has no bar at
/// that benchmark step.
pub type AlignedSeries = Vec<Option<Bar>>;

/// Owns every symbol's aligned bar series plus the benchmark timeline, and serves
/// historical-only slices as the simulation clock advances.
///
/// Built once via [`DataFeedBuilder`], then driven by [`DataFeed::advance`] one benchmark step at
/// a time; immutable apart from its cursor.
#[derive(Debug)]
pub struct DataFeed {
    timeline: BenchmarkTimeline,
    series: IndexMap<String, AlignedSeries>,
    index: Option<usize>,
    diagnostics: Diagnostics,
}

impl DataFeed {
    /// Returns a [`DataFeedBuilder`] instance.
    pub fn builder() -> DataFeedBuilder {
        DataFeedBuilder::new()
    }

    pub fn benchmark_timeline(&self) -> &BenchmarkTimeline {
        &self.timeline
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// The current benchmark index, or `None` before the first [`DataFeed::advance`] call.
    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    /// Advances the cursor by one benchmark step. Returns `false` once the timeline is
    /// exhausted, leaving the cursor pinned at the last valid index.
    pub fn advance(&mut self) -> bool {
        let next = match self.index {
            None => 0,
            Some(i) => i + 1,
        };
        if next >= self.timeline.len() {
            return false;
        }
        self.index = Some(next);
        true
    }

    pub fn current_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.index.and_then(|i| self.timeline.get(i))
    }

    /// Bars present at the current benchmark step, in symbol insertion order.
    pub fn current_bars(&self) -> IndexMap<String, Bar> {
        let Some(index) = self.index else {
            return IndexMap::new();
        };
        self.series
            .iter()
            .filter_map(|(symbol, aligned)| {
                aligned
                    .get(index)
                    .and_then(|slot| *slot)
                    .map(|bar| (symbol.clone(), bar))
            })
            .collect()
    }

    /// Up to `count` most-recent present bars for `symbol`, at indices in `[0, current_index]`,
    /// oldest first.
    pub fn get_bars(&self, symbol: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        if count < 1 {
            return Err(DataError::InvalidCount(count));
        }
        let Some(index) = self.index else {
            return Ok(Vec::new());
        };
        let Some(aligned) = self.series.get(symbol) else {
            return Ok(Vec::new());
        };

        let mut out: Vec<Bar> = aligned[..=index].iter().filter_map(|slot| *slot).collect();
        if out.len() > count {
            out = out.split_off(out.len() - count);
        }
        Ok(out)
    }

    /// True iff `symbol` has a present, non-suspended bar at the current benchmark step.
    pub fn is_tradable(&self, symbol: &str) -> bool {
        let Some(index) = self.index else {
            return false;
        };
        self.series
            .get(symbol)
            .and_then(|aligned| aligned.get(index))
            .and_then(|slot| *slot)
            .is_some_and(|bar| !bar.suspended)
    }

    /// The full benchmark-aligned series for `symbol`, `None` slots included. Used by the
    /// indicator engine to precompute dense indicator series in one pass.
    pub fn aligned_series(&self, symbol: &str) -> Option<&AlignedSeries> {
        self.series.get(symbol)
    }

    /// Warnings recorded while aligning symbol bars onto the benchmark timeline during
    /// [`DataFeedBuilder::build`].
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Clips the benchmark timeline (and every aligned series with it) to `[start, end]`,
    /// dropping steps outside that bound; a missing bound is unbounded on that side. Resets the
    /// cursor. A no-op when both bounds are `None`.
    pub fn clip(
        self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<DataFeed, DataError> {
        if start.is_none() && end.is_none() {
            return Ok(self);
        }

        let DataFeed { timeline, series, diagnostics, .. } = self;
        let keep: Vec<usize> = timeline
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, ts)| {
                start.map_or(true, |s| **ts >= s) && end.map_or(true, |e| **ts <= e)
            })
            .map(|(i, _)| i)
            .collect();

        let kept_timestamps: Vec<DateTime<Utc>> =
            keep.iter().map(|&i| timeline.as_slice()[i]).collect();
        let timeline = BenchmarkTimeline::new(kept_timestamps)?;

        let series = series
            .into_iter()
            .map(|(symbol, aligned)| {
                let clipped: AlignedSeries = keep.iter().map(|&i| aligned[i]).collect();
                (symbol, clipped)
            })
            .collect();

        Ok(DataFeed {
            timeline,
            series,
            index: None,
            diagnostics,
        })
    }
}

/// Builder to construct a [`DataFeed`] by aligning each symbol's bars onto the benchmark
/// timeline.
#[derive(Debug, Default)]
pub struct DataFeedBuilder {
    benchmark: Option<Vec<Bar>>,
    symbols: IndexMap<String, Vec<Bar>>,
}

impl DataFeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the benchmark bar series; its timestamps become the [`BenchmarkTimeline`].
    pub fn benchmark(mut self, bars: Vec<Bar>) -> Self {
        self.benchmark = Some(bars);
        self
    }

    /// Adds (or replaces) one symbol's raw bar series, in chronological order.
    pub fn add_market_data(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.symbols.insert(symbol.into(), bars);
        self
    }

    /// Aligns every registered symbol's bars onto the benchmark timeline and returns the
    /// resulting [`DataFeed`].
    ///
    /// Walks the benchmark timestamps and a symbol's bars in lockstep; a bar whose timestamp
    /// does not appear in the benchmark is dropped with a warning rather than causing a fatal
    /// error, since a stray bar in a vendor feed should not abort an otherwise-valid backtest.
    pub fn build(self) -> Result<DataFeed, DataError> {
        let benchmark_bars = self.benchmark.ok_or(DataError::BuilderIncomplete)?;
        let timestamps: Vec<_> = benchmark_bars.iter().map(|bar| bar.timestamp).collect();
        let timeline = BenchmarkTimeline::new(timestamps)?;

        let mut series = IndexMap::with_capacity(self.symbols.len());
        let mut diagnostics = Diagnostics::new();
        for (symbol, bars) in self.symbols {
            series.insert(symbol.clone(), align(&symbol, &timeline, bars, &mut diagnostics));
        }

        Ok(DataFeed {
            timeline,
            series,
            index: None,
            diagnostics,
        })
    }
}

fn align(
    symbol: &str,
    timeline: &BenchmarkTimeline,
    bars: Vec<Bar>,
    diagnostics: &mut Diagnostics,
) -> AlignedSeries {
    let mut aligned: AlignedSeries = vec![None; timeline.len()];
    let mut cursor = 0usize;

    for bar in bars {
        while cursor < timeline.len() && timeline.get(cursor).unwrap() < bar.timestamp {
            cursor += 1;
        }
        match timeline.get(cursor) {
            Some(ts) if ts == bar.timestamp => {
                aligned[cursor] = Some(bar);
            }
            _ => {
                warn!(
                    symbol,
                    timestamp = %bar.timestamp,
                    "dropping bar with timestamp not present in benchmark timeline"
                );
                diagnostics.push(Warning::BarOutsideBenchmark {
                    symbol: symbol.to_string(),
                    timestamp: bar.timestamp,
                });
            }
        }
    }

    aligned
}
