//! Tick sources.
//!
//! The engine reads market data through [`TickSource`]: an ordered list of
//! trading dates and, for each date, the ticks of that date sorted by
//! timestamp. Three sources are provided:
//! - [`MemoryFeed`]: ticks held in memory.
//! - [`SyntheticFeed`]: seeded random walk, handy for tests and demos.
//! - `JsonFeed`: one JSON file per date (needs the `serde` feature).

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::engine::{DepthItem, Tick};
use crate::errors::{Error, Result};

/// Provider of historical ticks.
pub trait TickSource {
    /// Returns the trading dates, ascending.
    fn dates(&self) -> Result<Vec<NaiveDate>>;

    /// Returns the ticks of `date`, ascending by timestamp.
    ///
    /// A source that has nothing for the date returns
    /// [`Error::DataUnavailable`].
    fn ticks(&self, date: NaiveDate) -> Result<Vec<Tick>>;
}

/// In-memory tick store.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    days: BTreeMap<NaiveDate, Vec<Tick>>,
}

impl MemoryFeed {
    /// Creates an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups `ticks` by UTC date, keeping arrival order for equal timestamps.
    pub fn from_ticks(ticks: impl IntoIterator<Item = Tick>) -> Self {
        let mut feed = Self::new();
        for tick in ticks {
            feed.days.entry(tick.timestamp.date_naive()).or_default().push(tick);
        }
        for day in feed.days.values_mut() {
            day.sort_by_key(|tick| tick.timestamp);
        }
        feed
    }

    /// Sets the ticks of `date`. They must already be sorted.
    pub fn insert(&mut self, date: NaiveDate, ticks: Vec<Tick>) {
        self.days.insert(date, ticks);
    }

    /// Returns the number of ticks over all dates.
    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// Returns `true` if the feed holds no tick.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TickSource for MemoryFeed {
    fn dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.days.keys().copied().collect())
    }

    fn ticks(&self, date: NaiveDate) -> Result<Vec<Tick>> {
        self.days
            .get(&date)
            .cloned()
            .ok_or_else(|| Error::DataUnavailable(date, "date not in feed".to_string()))
    }
}

/// Deterministic random-walk ticks.
///
/// Every symbol trades one tick per `interval` seconds during the session,
/// with a five level ladder around the last price. The same seed always
/// produces the same ticks.
#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    seed: u64,
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    session_start: NaiveTime,
    ticks_per_day: usize,
    interval: i64,
    base_price: f64,
}

impl SyntheticFeed {
    /// Creates a feed for `symbols` over `days` consecutive dates.
    pub fn new(seed: u64, symbols: &[&str], first_date: NaiveDate, days: usize) -> Self {
        Self {
            seed,
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            dates: first_date.iter_days().take(days).collect(),
            session_start: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            ticks_per_day: 600,
            interval: 1,
            base_price: 100.0,
        }
    }

    /// Sets the number of ticks per symbol and day.
    pub fn ticks_per_day(mut self, ticks: usize) -> Self {
        self.ticks_per_day = ticks;
        self
    }

    /// Sets the spacing of a symbol's ticks, in seconds.
    pub fn interval(mut self, seconds: i64) -> Self {
        self.interval = seconds.max(1);
        self
    }

    /// Sets the session start (UTC).
    pub fn session_start(mut self, time: NaiveTime) -> Self {
        self.session_start = time;
        self
    }

    /// Sets the starting price of every symbol.
    pub fn base_price(mut self, price: f64) -> Self {
        self.base_price = price;
        self
    }

    fn generate(&self, index: usize, date: NaiveDate) -> Vec<Tick> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64));
        let open = date.and_time(self.session_start).and_utc();
        let mut ticks = Vec::with_capacity(self.ticks_per_day * self.symbols.len());

        for symbol in &self.symbols {
            let mut price = self.base_price * rng.random_range(0.5..1.5);
            let mut volume = 0u64;
            for i in 0..self.ticks_per_day {
                let previous = price;
                price = (price * (1.0 + rng.random_range(-0.002..0.002))).max(0.05);
                price = (price * 20.0).round() / 20.0;
                // upticks trade at the ask, downticks at the bid
                let (bid_top, ask_top) = if price >= previous {
                    (price - 0.05, price)
                } else {
                    (price, price + 0.05)
                };
                volume += rng.random_range(1..500);
                let millis = rng.random_range(0..1000);
                let timestamp = open + Duration::seconds(i as i64 * self.interval) + Duration::milliseconds(millis);

                let level = |k: usize, rng: &mut StdRng| rng.random_range(1..200) * (k as u64 + 1);
                let bids = (0..5)
                    .map(|k| DepthItem::from((bid_top - 0.05 * k as f64, level(k, &mut rng), k as u32 + 1)))
                    .collect();
                let asks = (0..5)
                    .map(|k| DepthItem::from((ask_top + 0.05 * k as f64, level(k, &mut rng), k as u32 + 1)))
                    .collect();
                ticks.push(Tick::new(symbol.clone(), timestamp, price, volume).with_depth(bids, asks));
            }
        }

        ticks.sort_by_key(|tick| tick.timestamp);
        ticks
    }
}

impl TickSource for SyntheticFeed {
    fn dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.dates.clone())
    }

    fn ticks(&self, date: NaiveDate) -> Result<Vec<Tick>> {
        let index = self
            .dates
            .iter()
            .position(|d| *d == date)
            .ok_or_else(|| Error::DataUnavailable(date, "date outside the synthetic range".to_string()))?;
        Ok(self.generate(index, date))
    }
}

/// Directory of `YYYYMMDD.json` files, each holding a JSON array of ticks.
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct JsonFeed {
    dir: std::path::PathBuf,
}

#[cfg(feature = "serde")]
impl JsonFeed {
    /// Opens the directory `dir`.
    pub fn open(dir: impl Into<std::path::PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            )));
        }
        Ok(Self { dir })
    }

    fn path(&self, date: NaiveDate) -> std::path::PathBuf {
        self.dir.join(format!("{}.json", date.format("%Y%m%d")))
    }

    /// Writes the ticks of `date`.
    pub fn write(&self, date: NaiveDate, ticks: &[Tick]) -> Result<()> {
        let file = std::fs::File::create(self.path(date))?;
        serde_json::to_writer(std::io::BufWriter::new(file), ticks)?;
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl TickSource for JsonFeed {
    fn dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y%m%d") {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    fn ticks(&self, date: NaiveDate) -> Result<Vec<Tick>> {
        let unavailable = |e: &dyn std::fmt::Display| Error::DataUnavailable(date, e.to_string());
        let file = std::fs::File::open(self.path(date)).map_err(|e| unavailable(&e))?;
        let mut ticks: Vec<Tick> =
            serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| unavailable(&e))?;
        ticks.sort_by_key(|tick| tick.timestamp);
        Ok(ticks)
    }
}
