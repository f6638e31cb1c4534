use std::{env, path::Path, time::Instant};
use transistor_sweep::{init_logging, FromEasyExpert, GridExport, SweepTest};

fn export(path: &Path) -> anyhow::Result<()> {
    let test = SweepTest::from_path(path)?;
    let mut out = path.to_path_buf();
    // `data.csv.gz` -> `data.bin`
    while out.extension().is_some() {
        out.set_extension("");
    }
    GridExport::from(&test).to_bincode(out.with_extension("bin"))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging("info");

    let paths: Vec<_> = env::args().skip(1).collect();
    let now = Instant::now();

    #[cfg(feature = "progress")]
    let mut progress = linya::Progress::new();
    #[cfg(feature = "progress")]
    let bar = progress.bar(paths.len(), "Exporting");

    let mut n_failed = 0usize;
    for arg in &paths {
        if let Err(e) = export(Path::new(arg)) {
            tracing::error!("{arg}: {e:#}");
            n_failed += 1;
        }
        #[cfg(feature = "progress")]
        progress.inc_and_draw(&bar, 1);
    }
    println!(
        "{} exported, {} failed in {}ms",
        paths.len() - n_failed,
        n_failed,
        now.elapsed().as_millis()
    );

    Ok(())
}
