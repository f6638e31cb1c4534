//! Generates the Python decoders of the `sweep_export` bincode files
//!
//! Usage: `gridpy [OUTPUT_DIR] [MODULE]`, defaulting to `gridpy` and `gridexport`.
//! The traced format registry is written next to the module as `registry.yaml`.

use anyhow::Context;
use serde_generate::{python3, CodeGeneratorConfig, Encoding, SourceInstaller};
use serde_reflection::{Registry, Tracer, TracerConfig};
use std::{env, fs, path::PathBuf};
use transistor_sweep::{ExportedGrid, GridExport};

fn registry() -> anyhow::Result<Registry> {
    let mut tracer = Tracer::new(TracerConfig::default());
    tracer.trace_simple_type::<ExportedGrid>()?;
    tracer.trace_simple_type::<GridExport>()?;
    Ok(tracer.registry()?)
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "gridpy".to_string()));
    let module = args.next().unwrap_or_else(|| "gridexport".to_string());

    let registry = registry()?;
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    fs::write(out_dir.join("registry.yaml"), serde_yaml::to_string(&registry)?)?;

    let config = CodeGeneratorConfig::new(module.clone()).with_encodings(vec![Encoding::Bincode]);
    let installer = python3::Installer::new(out_dir.clone(), None);
    // the installer errors are not `Send + Sync`
    let install = |err: Box<dyn std::error::Error>| anyhow::anyhow!("{err}");
    installer.install_module(&config, &registry).map_err(install)?;
    installer.install_bincode_runtime().map_err(install)?;
    installer.install_serde_runtime().map_err(install)?;

    println!(
        "{module}: {} formats installed in {}",
        registry.len(),
        out_dir.display()
    );
    Ok(())
}
