use std::collections::BTreeMap;

use chrono::NaiveDate;
use tick_bts::prelude::*;

fn main() -> anyhow::Result<()> {
    let date = NaiveDate::from_ymd_opt(2024, 5, 6).ok_or_else(|| anyhow::anyhow!("invalid date"))?;
    let feed = SyntheticFeed::new(11, &["ALFA", "BETA"], date, 1)
        .ticks_per_day(900)
        .base_price(20.0);

    let mut monitors = BTreeMap::<String, OrderFlowMonitor>::new();
    for tick in feed.ticks(date)? {
        monitors.entry(tick.symbol.clone()).or_default().update(&tick);
    }

    for (symbol, monitor) in &monitors {
        println!("== {symbol} ==");
        println!("{monitor}");
        println!(
            "ticks updated {} | imbalance {:+}",
            monitor.ticks_updated(),
            monitor.imbalance()
        );
        println!();
    }

    Ok(())
}
