//! Frame an RFID identifier list for LoRa and report the airtime budget.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin epc-framer -- --input tags.txt --sf 12 --output results.jsonl
//! cargo run --bin epc-framer -- --random 500 --sf 9 --send
//! ```
//!
//! Set `RUST_LOG=debug` for per-frame detail.

use clap::Parser;
use epc_lora_framer::epc::{load_identifiers, Identifier};
use epc_lora_framer::lora::{DutyCyclePlanner, RadioConfig, Region};
use epc_lora_framer::sink::{JsonLinesSink, MemorySink};
use epc_lora_framer::transport::{LogTransport, Transport};
use epc_lora_framer::{Error, Pipeline};
use log::{error, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "epc-framer")]
#[command(about = "Pack RFID identifiers into LoRa frames and plan their airtime")]
struct Args {
    /// Identifier list (.txt or .csv, one identifier per line)
    #[arg(long, short, conflicts_with = "random", required_unless_present = "random")]
    input: Option<PathBuf>,

    /// Generate this many random identifiers instead of reading a file
    #[arg(long)]
    random: Option<usize>,

    /// Spreading factor (7-12)
    #[arg(long, default_value_t = 12)]
    sf: u8,

    /// Bandwidth in kHz (125, 250, 500)
    #[arg(long, default_value_t = 125)]
    bw: u32,

    /// Coding rate index (1-4 for 4/5 to 4/8)
    #[arg(long, default_value_t = 1)]
    cr: u8,

    /// Region (eu868, us915, au915, as923); defaults to the build's region
    #[arg(long)]
    region: Option<Region>,

    /// Duty cycle as a fraction (0.01 = 1%); defaults to the region's limit
    #[arg(long)]
    duty_cycle: Option<f64>,

    /// Override the region's payload limit in bytes
    #[arg(long)]
    max_payload: Option<usize>,

    /// Write result records as JSON lines to this file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Log each frame as it would be transmitted
    #[arg(long)]
    send: bool,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let region = args.region.unwrap_or_default();

    let mut builder = RadioConfig::builder()
        .spreading_factor(args.sf)
        .bandwidth_khz(args.bw)
        .coding_rate(args.cr)
        .region(region);
    if let Some(bytes) = args.max_payload {
        builder = builder.max_payload_override(bytes);
    }
    let config = builder.build()?;

    let planner = match args.duty_cycle {
        Some(fraction) => DutyCyclePlanner::new(fraction)?,
        None => DutyCyclePlanner::for_region(region),
    };

    let ids: Vec<Identifier> = match (&args.input, args.random) {
        (Some(path), _) => load_identifiers(path)?,
        (None, Some(n)) => {
            info!("Generating {} random identifiers", n);
            let mut rng = rand_core::OsRng;
            (0..n).map(|_| Identifier::random(&mut rng)).collect()
        }
        (None, None) => Vec::new(),
    };

    let pipeline = Pipeline::new(config, planner);

    let mut log_transport = LogTransport::new();
    let transport: Option<&mut dyn Transport> = if args.send {
        Some(&mut log_transport)
    } else {
        None
    };

    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|source| Error::Output {
                path: path.clone(),
                source,
            })?;
            let mut sink = JsonLinesSink::new(BufWriter::new(file));
            let summary = pipeline.run(&ids, &mut sink, transport)?;
            sink.into_inner()?;
            info!("Results written to {}", path.display());
            summary
        }
        None => pipeline.run(&ids, &mut MemorySink::new(), transport)?,
    };

    if summary.failed_verifications > 0 {
        error!(
            "{} frames failed decode verification",
            summary.failed_verifications
        );
    }
    Ok(())
}
