use range_mppi::config::Config;
use range_mppi::controller::Controller;
use range_mppi::sim::{coupled, SimMarket, SimPool};
use range_mppi::telemetry::CsvSink;
use range_mppi::tick;

// Closed-loop run against the in-process market/pool simulator.
// cargo run --example sim --release [config.json]
fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let cfg = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let market = SimMarket::new(tick::tick_to_price(78240.0), cfg.noise, 42);
    let pool = SimPool::new(78240.0, None, cfg.dynamics);
    let (feed, ledger) = coupled(market, pool);
    let sink = CsvSink::open("cycles.csv")?;

    let mut ctl = Controller::new(cfg, feed, ledger, sink, 42)?;
    for _ in 0..200 {
        let rec = ctl.run_cycle();
        println!(
            "cycle {:3} | market {:8.1} pool {:8.1} | range c={:8.1} h={:7.1} | u=({:6.1}, {:6.1}) | rebalanced={}",
            rec.cycle,
            rec.market_tick.unwrap_or(f64::NAN),
            rec.pool_tick.unwrap_or(f64::NAN),
            rec.center_tick.unwrap_or(f64::NAN),
            rec.half_width.unwrap_or(f64::NAN),
            rec.d_center.unwrap_or(f64::NAN),
            rec.d_half_width.unwrap_or(f64::NAN),
            rec.rebalanced,
        );
    }
    Ok(())
}
