//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::Timeframe;

/// OHLC bar for a single instrument over one timeframe interval.
///
/// `timestamp` is the bar's open time and is the ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Tick volume. Zero when the source does not report it.
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// OHLC sanity: high >= max(open, close), low <= min(open, close), high >= low.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Intrabar range (high - low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Total order: timestamp first, then OHLC and volume by `f64::total_cmp`.
    /// Bars sharing a timestamp sort the same way whatever order they arrive in.
    pub fn chronological(&self, other: &Bar) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.open.total_cmp(&other.open))
            .then_with(|| self.high.total_cmp(&other.high))
            .then_with(|| self.low.total_cmp(&other.low))
            .then_with(|| self.close.total_cmp(&other.close))
            .then_with(|| self.volume.total_cmp(&other.volume))
    }

    /// Time at which this bar's interval ends.
    pub fn close_time(&self, timeframe: Timeframe) -> DateTime<Utc> {
        self.timestamp + timeframe.duration()
    }
}

/// An ordered run of bars for one symbol and timeframe, as handed over by a
/// data provider.
///
/// `as_of` records when the series was retrieved. Bars whose interval has not
/// closed by then are still forming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
            as_of: None,
        }
    }

    /// Set the retrieval time used for forming-bar detection.
    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// True if `bar` had not closed at `as_of`. Always false without `as_of`.
    pub fn is_forming(&self, bar: &Bar) -> bool {
        match self.as_of {
            Some(as_of) => bar.close_time(self.timeframe) > as_of,
            None => false,
        }
    }

    /// Bars that had closed by `as_of`, in [`Bar::chronological`] order.
    pub fn closed_bars_sorted(&self) -> Vec<Bar> {
        let mut bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| !self.is_forming(b))
            .cloned()
            .collect();
        bars.sort_by(Bar::chronological);
        bars
    }

    /// All bars in [`Bar::chronological`] order, forming bars included.
    pub fn sorted_bars(&self) -> Vec<Bar> {
        let mut bars = self.bars.clone();
        bars.sort_by(Bar::chronological);
        bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_bar() -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            1.1000,
            1.1050,
            1.0980,
            1.1030,
        )
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());

        let mut bar = sample_bar();
        bar.high = f64::INFINITY;
        assert!(bar.is_void());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 1.0970; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }

    #[test]
    fn forming_bar_detection() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let bars = vec![
            Bar::new(t0, 1.0, 1.1, 0.9, 1.0),
            Bar::new(t0 + Duration::hours(1), 1.0, 1.1, 0.9, 1.0),
        ];
        // Retrieved 30 minutes into the second bar.
        let series = BarSeries::new("EURUSD", Timeframe::H1, bars)
            .with_as_of(t0 + Duration::minutes(90));

        assert!(!series.is_forming(&series.bars[0]));
        assert!(series.is_forming(&series.bars[1]));
        assert_eq!(series.closed_bars_sorted().len(), 1);
        assert_eq!(series.sorted_bars().len(), 2);
    }

    #[test]
    fn no_as_of_means_all_closed() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let series = BarSeries::new(
            "EURUSD",
            Timeframe::H1,
            vec![Bar::new(t0, 1.0, 1.1, 0.9, 1.0)],
        );
        assert!(!series.is_forming(&series.bars[0]));
    }

    #[test]
    fn closed_bars_are_sorted() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let bars = vec![
            Bar::new(t0 + Duration::days(2), 1.0, 1.1, 0.9, 1.0),
            Bar::new(t0, 1.0, 1.1, 0.9, 1.0),
            Bar::new(t0 + Duration::days(1), 1.0, 1.1, 0.9, 1.0),
        ];
        let series = BarSeries::new("EURUSD", Timeframe::D1, bars);
        let sorted = series.closed_bars_sorted();
        assert!(sorted.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn tied_timestamps_sort_the_same_either_way() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let a = Bar::new(t0, 1.0, 1.1, 0.9, 1.0);
        let b = Bar::new(t0, 1.2, 1.25, 1.19, 1.24);

        let forward = BarSeries::new("EURUSD", Timeframe::H1, vec![a.clone(), b.clone()]);
        let reversed = BarSeries::new("EURUSD", Timeframe::H1, vec![b, a]);
        assert_eq!(forward.sorted_bars(), reversed.sorted_bars());
        assert_eq!(forward.closed_bars_sorted(), reversed.closed_bars_sorted());
        assert_eq!(forward.sorted_bars()[0].open, 1.0);
    }
}
