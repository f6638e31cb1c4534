use std::{env, path::Path};
use transistor_sweep::GridExport;

fn main() -> anyhow::Result<()> {
    for arg in env::args().skip(1) {
        let path = Path::new(&arg);
        println!("{:?}", path);
        let export = GridExport::from_bincode(path)?;
        export.to_pickle(path.with_extension("pkl"))?;
    }
    Ok(())
}
