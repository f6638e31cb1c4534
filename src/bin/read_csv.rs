use std::{env, time::Instant};
use transistor_sweep::{init_logging, Axis, FromEasyExpert, SweepTest};

fn main() -> anyhow::Result<()> {
    init_logging("info");

    for arg in env::args().skip(1) {
        let now = Instant::now();
        let test = SweepTest::from_path(&arg)?;
        println!("{arg}: {}ms", now.elapsed().as_millis());

        println!(" title     : {}", test.title());
        println!(" sweep kind: {}", test.sweep_kind());
        println!(" shape     : {:?}", test.grid.shape());
        for axis in [Axis::X, Axis::Y] {
            let interval = test.interval(axis);
            println!(
                " {:?} {:>8}: start={} stop={} step={} count={}",
                axis, interval.name, interval.start, interval.stop, interval.step, interval.count
            );
        }
        println!(" index\theader");
        for (i, header) in test.headers().iter().enumerate() {
            println!("   {i}\t{header}");
        }
    }
    Ok(())
}
