use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use trxfw_core::format::HeaderConfig;
use trxfw_core::{build_image, inspect, ImageFormat, Inspection};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Trx,
    Chk,
    Bcm,
}

impl From<Format> for ImageFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Trx => ImageFormat::Trx,
            Format::Chk => ImageFormat::Chk,
            Format::Bcm => ImageFormat::Bcm,
        }
    }
}

#[derive(Parser)]
#[command(name = "mktrxfw", version, about = "Build and inspect TRX/CHK/BCM firmware images")]
struct Cli {
    /// Print the header of an existing image
    #[arg(short = 'v', value_name = "FILE", conflicts_with = "create")]
    view: Option<PathBuf>,
    /// Assemble payloads into an image; the last path is the output
    #[arg(short = 'c', num_args = 2.., value_name = "FILE")]
    create: Option<Vec<PathBuf>>,
    /// Header format
    #[arg(short = 'f', long, value_enum, default_value_t = Format::Trx)]
    format: Format,
    /// CHK model name
    #[arg(long)]
    model: Option<String>,
    /// BCM firmware name
    #[arg(long)]
    name: Option<String>,
    /// BCM load address (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_u32)]
    load_address: Option<u32>,
    /// BCM timestamp in unix seconds (defaults to now)
    #[arg(long)]
    timestamp: Option<u32>,
    /// Print the decoded header (or the build report with -c) as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
    /// More log output (-d info, -dd debug)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    debug: u8,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            usage(ImageFormat::Trx);
            return Ok(());
        }
        Err(e) => e.exit(),
    };
    init_logger(cli.debug);
    let format = ImageFormat::from(cli.format);

    if let Some(path) = &cli.view {
        let report =
            inspect(path, format).with_context(|| format!("inspect {}", path.display()))?;
        print_inspection(&report, cli.json)?;
        return Ok(());
    }
    if let Some(files) = &cli.create {
        let (output, inputs) = files
            .split_last()
            .ok_or_else(|| anyhow!("missing output path"))?;
        let cfg = header_config(&cli);
        let report = build_image(inputs, output, format, &cfg)
            .with_context(|| format!("create {} image {}", format, output.display()))?;
        if let Some(n) = report.padding {
            eprintln!("Inserted {} bytes of alignment padding", n);
        }
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        } else {
            print!("{}", report.verify);
        }
        return Ok(());
    }
    usage(format);
    Ok(())
}

fn init_logger(debug: u8) {
    let level = match debug {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn header_config(cli: &Cli) -> HeaderConfig {
    let mut cfg = HeaderConfig::default();
    if let Some(m) = &cli.model {
        cfg.model_name = m.clone();
    }
    if let Some(n) = &cli.name {
        cfg.firmware_name = n.clone();
    }
    if let Some(a) = cli.load_address {
        cfg.load_address = a;
    }
    cfg.timestamp = cli.timestamp;
    cfg
}

fn print_inspection(report: &Inspection, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn usage(format: ImageFormat) {
    let prog = std::env::args()
        .next()
        .unwrap_or_else(|| "mktrxfw".to_string());
    println!("usage: {} [-f trx|chk|bcm] -v filename", prog);
    println!("       {} [-f trx|chk|bcm] -c {} output", prog, format.create_args());
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    r.map_err(|e| format!("bad number {s:?}: {e}"))
}
