use range_mppi::config::Config;
use range_mppi::mppi::Mppi;
use range_mppi::{Control, State};

// One planning pass from a fixed state, printing the fused sequence.
// cargo run --example plan_once --release
fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let cfg = Config::default();
    let mppi = Mppi::new(&cfg)?;

    // Market has escaped the active range on the upside.
    let x = State::new(80300.0, 80100.0, 78240.0, 2000.0);
    let nominal = vec![Control::zeros(); cfg.mppi.horizon];

    let plan = mppi.compute(&x, &nominal, 42)?;
    println!(
        "decision: dc={:8.2} dw={:8.2}",
        plan.decision[0], plan.decision[1]
    );
    println!(
        "cost: min={:.4} mean={:.4} max={:.4} ess={:.1}",
        plan.stats.min, plan.stats.mean, plan.stats.max, plan.stats.effective_samples
    );
    for (t, u) in plan.nominal.iter().enumerate() {
        println!("  t={t}: ({:8.2}, {:8.2})", u[0], u[1]);
    }
    Ok(())
}
