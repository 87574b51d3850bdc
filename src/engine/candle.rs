use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::Tick;
use crate::errors::{Error, Result};

/// An OHLCV bar.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl From<(DateTime<Utc>, f64, f64, f64, f64, u64)> for Candle {
    fn from((time, open, high, low, close, volume): (DateTime<Utc>, f64, f64, f64, f64, u64)) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl Candle {
    /// Returns the bucket start time.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the high price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the low price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the volume traded inside the bucket.
    pub fn volume(&self) -> u64 {
        self.volume
    }
}

/// Builds fixed-period candles from ticks.
///
/// Buckets are aligned on the session start of the tick's local date. The
/// running candle is only harvested when [`CandleAggregator::has_changed`] is
/// called with a time at or past the end of its bucket, so the consuming
/// strategy decides the cadence (usually from `on_periodic`).
///
/// ```rust
/// use tick_bts::prelude::*;
/// use chrono::{NaiveTime, TimeZone, Utc};
///
/// let session = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
/// let mut candles = CandleAggregator::new(60, session).unwrap();
/// let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 10).unwrap();
/// candles.update(&Tick::new("ACME", at, 100.0, 10));
///
/// assert!(!candles.has_changed(at));
/// assert!(candles.has_changed(Utc.with_ymd_and_hms(2024, 1, 2, 9, 16, 0).unwrap()));
/// assert_eq!(candles.close(), &[100.0]);
/// ```
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    period: u32,
    session_start: NaiveTime,
    offset: FixedOffset,
    // Session start of the current local date, in UTC
    anchor: Option<DateTime<Utc>>,
    current: Candle,
    harvest_at: DateTime<Utc>,
    ticks_received: u32,
    total_volume: u64,
    last_price: f64,
    candles: Vec<Candle>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl CandleAggregator {
    /// Creates an aggregator of `period` seconds whose session opens at
    /// `session_start` (UTC, see [`CandleAggregator::with_offset`]).
    pub fn new(period: u32, session_start: NaiveTime) -> Result<Self> {
        if period == 0 {
            return Err(Error::InvalidPeriod(period));
        }

        Ok(Self {
            period,
            session_start,
            offset: FixedOffset::east_opt(0).ok_or(Error::Unreachable("UTC offset".to_string()))?,
            anchor: None,
            current: Candle::from((DateTime::default(), 0.0, 0.0, 0.0, 0.0, 0)),
            harvest_at: DateTime::default(),
            ticks_received: 0,
            total_volume: 0,
            last_price: 0.0,
            candles: Vec::new(),
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
        })
    }

    /// Interprets the session start in the exchange local time `offset`.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    fn session_anchor(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = NaiveDateTime::new(date, self.session_start);
        (local - Duration::seconds(self.offset.local_minus_utc() as i64)).and_utc()
    }

    /// Feeds a tick into the running candle.
    pub fn update(&mut self, tick: &Tick) {
        let at = tick.timestamp;
        let price = tick.last_price;

        if self.ticks_received == 0 {
            let date = at.with_timezone(&self.offset).date_naive();
            let anchor = match self.anchor {
                Some(anchor) if anchor.with_timezone(&self.offset).date_naive() == date => anchor,
                _ => self.session_anchor(date),
            };
            self.anchor = Some(anchor);
            if at < anchor {
                return;
            }

            let period = self.period as i64;
            let bucket = (at - anchor).num_seconds() / period * period;
            let time = anchor + Duration::seconds(bucket);
            self.current = Candle::from((time, price, price, price, price, 0));
            self.harvest_at = time + Duration::seconds(period);
        } else {
            self.current.high = self.current.high.max(price);
            self.current.low = self.current.low.min(price);
        }

        self.last_price = price;
        self.current.close = price;
        // non-tradable instruments have no meaningful volume
        if tick.tradable {
            if tick.volume < self.total_volume {
                self.total_volume = 0;
            }
            self.current.volume += tick.volume - self.total_volume;
            self.total_volume = tick.volume;
        }
        self.ticks_received += 1;
    }

    /// Harvests the running candle if `now` reached the end of its bucket.
    ///
    /// Returns `true` when a new candle was appended to the history.
    pub fn has_changed(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.harvest_at || self.ticks_received == 0 {
            return false;
        }

        let candle = self.current;
        self.candles.push(candle);
        self.open.push(candle.open);
        self.high.push(candle.high);
        self.low.push(candle.low);
        self.close.push(candle.close);
        self.volume.push(candle.volume as f64);
        self.ticks_received = 0;
        true
    }

    /// Returns the period in seconds.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Returns the last accepted price.
    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    /// Returns the running candle, if a tick contributed to it.
    pub fn current(&self) -> Option<&Candle> {
        (self.ticks_received > 0).then_some(&self.current)
    }

    /// Returns the harvested candles.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Returns the open prices of the harvested candles.
    pub fn open(&self) -> &[f64] {
        &self.open
    }

    /// Returns the high prices of the harvested candles.
    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Returns the low prices of the harvested candles.
    pub fn low(&self) -> &[f64] {
        &self.low
    }

    /// Returns the close prices of the harvested candles.
    pub fn close(&self) -> &[f64] {
        &self.close
    }

    /// Returns the volumes of the harvested candles.
    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    /// Returns the number of harvested candles.
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Returns `true` if no candle was harvested yet.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, s).unwrap()
    }

    fn tick(time: DateTime<Utc>, price: f64, volume: u64) -> Tick {
        Tick::new("ACME", time, price, volume)
    }

    fn aggregator(period: u32) -> CandleAggregator {
        CandleAggregator::new(period, NaiveTime::from_hms_opt(9, 15, 0).unwrap()).unwrap()
    }

    #[test]
    fn zero_period_is_rejected() {
        let result = CandleAggregator::new(0, NaiveTime::MIN);
        assert!(matches!(result, Err(Error::InvalidPeriod(0))));
    }

    #[test]
    fn ohlc_inside_one_bucket() {
        let mut candles = aggregator(60);
        candles.update(&tick(at(9, 20, 1), 100.0, 10));
        candles.update(&tick(at(9, 20, 15), 105.0, 12));
        candles.update(&tick(at(9, 20, 30), 98.0, 15));
        candles.update(&tick(at(9, 20, 59), 102.0, 20));
        assert!(!candles.has_changed(at(9, 20, 59)));
        assert!(candles.has_changed(at(9, 21, 0)));

        let candle = candles.candles()[0];
        assert_eq!(candle.time(), at(9, 20, 0));
        assert_eq!(
            (candle.open(), candle.high(), candle.low(), candle.close()),
            (100.0, 105.0, 98.0, 102.0)
        );
        assert_eq!(candle.volume(), 20);
        assert_eq!(candles.open(), &[100.0]);
        assert_eq!(candles.high(), &[105.0]);
        assert_eq!(candles.low(), &[98.0]);
        assert_eq!(candles.close(), &[102.0]);
        assert_eq!(candles.volume(), &[20.0]);
        assert_eq!(candles.last_price(), 102.0);
    }

    #[test]
    fn harvest_happens_once() {
        let mut candles = aggregator(60);
        candles.update(&tick(at(9, 15, 0), 10.0, 1));
        assert!(candles.has_changed(at(9, 16, 0)));
        assert!(!candles.has_changed(at(9, 16, 0)));
        assert!(!candles.has_changed(at(9, 30, 0)));
        assert_eq!(candles.len(), 1);
        assert!(candles.current().is_none());
    }

    #[test]
    fn no_tick_no_candle() {
        let mut candles = aggregator(60);
        assert!(!candles.has_changed(at(12, 0, 0)));
        assert!(candles.is_empty());
    }

    #[test]
    fn buckets_align_on_session_start() {
        let mut candles = aggregator(300);
        candles.update(&tick(at(9, 27, 42), 10.0, 1));
        assert_eq!(candles.current().map(|c| c.time()), Some(at(9, 25, 0)));
        assert!(!candles.has_changed(at(9, 29, 59)));
        assert!(candles.has_changed(at(9, 30, 0)));
    }

    #[test]
    fn ticks_before_session_are_ignored() {
        let mut candles = aggregator(60);
        candles.update(&tick(at(9, 0, 0), 50.0, 5));
        assert!(candles.current().is_none());
        assert_eq!(candles.last_price(), 0.0);

        candles.update(&tick(at(9, 15, 5), 51.0, 8));
        assert_eq!(candles.current().map(|c| c.open()), Some(51.0));
    }

    #[test]
    fn volume_is_converted_to_deltas() {
        let mut candles = aggregator(60);
        candles.update(&tick(at(9, 15, 1), 10.0, 100));
        candles.update(&tick(at(9, 15, 2), 10.0, 130));
        assert!(candles.has_changed(at(9, 16, 0)));
        candles.update(&tick(at(9, 16, 1), 10.0, 180));
        assert!(candles.has_changed(at(9, 17, 0)));
        assert_eq!(candles.volume(), &[130.0, 50.0]);
    }

    #[test]
    fn decreasing_volume_resets_the_counter() {
        let mut candles = aggregator(60);
        candles.update(&tick(at(9, 15, 1), 10.0, 500));
        assert!(candles.has_changed(at(9, 16, 0)));
        candles.update(&tick(at(9, 16, 1), 10.0, 40));
        candles.update(&tick(at(9, 16, 2), 10.0, 45));
        assert!(candles.has_changed(at(9, 17, 0)));
        assert_eq!(candles.volume(), &[500.0, 45.0]);
    }

    #[test]
    fn non_tradable_ticks_carry_no_volume() {
        let mut candles = aggregator(60);
        candles.update(&tick(at(9, 15, 1), 22_000.0, 0).with_tradable(false));
        candles.update(&tick(at(9, 15, 2), 22_010.0, 0).with_tradable(false));
        assert!(candles.has_changed(at(9, 16, 0)));
        assert_eq!(candles.volume(), &[0.0]);
        assert_eq!(candles.close(), &[22_010.0]);
    }

    #[test]
    fn session_is_reanchored_on_a_new_date() {
        let mut candles = aggregator(3600);
        candles.update(&tick(at(10, 0, 0), 10.0, 1));
        assert!(candles.has_changed(at(11, 0, 0)));

        let next_day = Utc.with_ymd_and_hms(2024, 3, 5, 9, 20, 0).unwrap();
        candles.update(&tick(next_day, 11.0, 1));
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 9, 15, 0).unwrap();
        assert_eq!(candles.current().map(|c| c.time()), Some(expected));
    }

    #[test]
    fn session_start_in_local_time() {
        // 09:15 IST is 03:45 UTC
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let mut candles = aggregator(60).with_offset(ist);
        candles.update(&tick(at(3, 40, 0), 10.0, 1));
        assert!(candles.current().is_none());

        candles.update(&tick(at(3, 45, 30), 10.0, 2));
        assert_eq!(candles.current().map(|c| c.time()), Some(at(3, 45, 0)));
    }
}
