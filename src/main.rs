//! Command-line driver: read keys, build the MPHF, write the C source.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use eyre::{WrapErr as _, eyre};
use mphgen::{BuildConfig, Builder, EmitOptions, SplitMix3, emit_c, emit_map};

#[derive(Debug, Parser)]
#[command(name = "mphgen")]
#[command(about = "Generate a C minimal perfect hash function for a key set")]
struct Cli {
    /// File with one key per line; stdin when omitted
    input: Option<PathBuf>,

    /// Expansion constant v/n (at least 1.24)
    #[arg(short = 'c', long = "expansion", default_value_t = 1.24)]
    expansion: f64,

    /// Seeds to try before giving up
    #[arg(short = 'i', long = "iterations", default_value_t = 1000)]
    iterations: u32,

    /// Name of the generated function
    #[arg(short = 'n', long = "name", default_value = "hash")]
    name: String,

    /// Write the generated source here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Write the key-order permutation map here
    #[arg(short = 'm', long = "map")]
    map: Option<PathBuf>,

    /// Give the generated function internal (static) linkage
    #[arg(short = 's', long = "static")]
    static_hash: bool,

    /// Base seed for the deterministic retry schedule
    #[arg(long = "seed", default_value_t = 0xC0FF_EE00_D15E_A5E)]
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let keys = match &cli.input {
        Some(path) => read_keys(
            File::open(path).wrap_err_with(|| format!("cannot open {}", path.display()))?,
        )?,
        None => read_keys(io::stdin().lock())?,
    };

    let cfg = BuildConfig {
        c: cli.expansion,
        max_attempts: cli.iterations,
        seed: cli.seed,
    };
    // Build (and validate parameters) before touching any output path, so
    // a failed run leaves no files behind.
    let mph = Builder::new().with_config(cfg).build(keys)?;

    let opts = EmitOptions {
        hash_name: cli.name.clone(),
        static_hash: cli.static_hash,
    };
    match &cli.output {
        Some(path) => {
            let mut out = BufWriter::new(
                File::create(path)
                    .wrap_err_with(|| format!("cannot create {}", path.display()))?,
            );
            emit_c(&mut out, &mph, &SplitMix3, &opts)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            emit_c(&mut out, &mph, &SplitMix3, &opts)?;
            out.flush()?;
        }
    }

    if let Some(path) = &cli.map {
        let mut out = BufWriter::new(
            File::create(path).wrap_err_with(|| format!("cannot create {}", path.display()))?,
        );
        emit_map(&mut out, &mph)?;
        out.flush()?;
    }

    Ok(())
}

/// Keys are raw byte strings, one per line (no trailing newline needed).
fn read_keys<R: Read>(input: R) -> eyre::Result<Vec<Vec<u8>>> {
    let mut keys = Vec::new();
    for line in BufReader::new(input).split(b'\n') {
        keys.push(line.wrap_err("reading keys")?);
    }
    if keys.is_empty() {
        return Err(eyre!("no keys on input"));
    }
    Ok(keys)
}
