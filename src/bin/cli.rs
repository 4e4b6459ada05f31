// src/bin/cli.rs
use elab_bridge::cli;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    cli::load_env(std::path::Path::new("."));
    cli::run()
}
