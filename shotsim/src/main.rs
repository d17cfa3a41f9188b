use anyhow::Result;
use clap::Parser;

use shotsim::{Args, init_tracing, run};

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log);
    run(&args)?;
    Ok(())
}
