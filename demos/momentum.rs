use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};
use tick_bts::prelude::*;
use tracing_subscriber::EnvFilter;

const PERIOD: usize = 15;

struct Indicators {
    candles: CandleAggregator,
    sma_high: SimpleMovingAverage,
    ema_close: ExponentialMovingAverage,
    sma_low: SimpleMovingAverage,
    // (ema close, sma high, sma low) of the previous candle
    previous: Option<(f64, f64, f64)>,
}

impl Indicators {
    fn new() -> Result<Self> {
        let session = NaiveTime::from_hms_opt(9, 15, 0).ok_or(Error::Msg("invalid session start".to_string()))?;
        Ok(Self {
            candles: CandleAggregator::new(60, session)?,
            sma_high: SimpleMovingAverage::new(PERIOD).map_err(|e| Error::Msg(format!("{e:?}")))?,
            ema_close: ExponentialMovingAverage::new(PERIOD).map_err(|e| Error::Msg(format!("{e:?}")))?,
            sma_low: SimpleMovingAverage::new(PERIOD).map_err(|e| Error::Msg(format!("{e:?}")))?,
            previous: None,
        })
    }
}

/// Buys when the close EMA crosses over the SMA of the highs, sells when it
/// crosses under the SMA of the lows. One minute candles.
#[derive(Default)]
struct Momentum {
    symbol: String,
    state: Option<Indicators>,
}

impl Strategy for Momentum {
    fn setup(&mut self, symbol: &str, book: &mut Book) -> Result<Vec<String>> {
        self.symbol = symbol.to_string();
        self.state = Some(Indicators::new()?);
        book.allocate_cash(10_000.0);
        Ok(vec![symbol.to_string()])
    }

    fn on_tick(&mut self, tick: &Tick, _book: &mut Book) -> Result<()> {
        if tick.symbol != self.symbol {
            return Ok(());
        }
        if let Some(state) = self.state.as_mut() {
            state.candles.update(tick);
        }
        Ok(())
    }

    fn on_periodic(&mut self, now: DateTime<Utc>, book: &mut Book) -> Result<()> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        if !state.candles.has_changed(now) {
            return Ok(());
        }
        let Some(candle) = state.candles.candles().last().copied() else {
            return Ok(());
        };

        let ema = state.ema_close.next(candle.close());
        let high = state.sma_high.next(candle.high());
        let low = state.sma_low.next(candle.low());

        if let Some((prev_ema, prev_high, prev_low)) = state.previous.filter(|_| state.candles.len() > PERIOD) {
            let ltp = state.candles.last_price();
            if book.is_book_clean() && prev_ema <= prev_high && ema > high {
                book.buy(book.quantity_affordable(ltp));
            }
            if book.in_position() && prev_ema >= prev_low && ema < low {
                book.sell(book.position());
            }
        }
        state.previous = Some((ema, high, low));
        Ok(())
    }

    fn on_close(&mut self, book: &mut Book) -> Result<()> {
        book.exit();
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut registry = StrategyRegistry::new();
    registry.register_default::<Momentum>("momentum")?;

    let first = NaiveDate::from_ymd_opt(2024, 5, 6).ok_or_else(|| anyhow::anyhow!("invalid date"))?;
    // six hours of five second ticks
    let feed = SyntheticFeed::new(2024, &["ALFA", "BETA", "GAMMA"], first, 5)
        .ticks_per_day(4_320)
        .interval(5);

    let mut engine = Engine::new(registry).with_config(EngineConfig::default().mode(RunMode::Daily));
    engine.run(&feed)?;

    println!("{}", AlgoScore::header());
    for score in engine.scores() {
        println!("{score}");
    }
    println!("fills {}", engine.ledger().len());

    Ok(())
}
